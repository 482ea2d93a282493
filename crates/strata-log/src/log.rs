//! The Log
//!
//! Directory-scoped collection of segments. The log owns the full record
//! lifecycle: it routes appends to the active segment, rolls to a fresh
//! segment when the active one fills, scans segments to serve point reads,
//! truncates old segments, and streams the raw store bytes for snapshots.
//!
//! ## Recovery
//!
//! `open` lists the directory and rebuilds one segment per
//! `{base}.store`/`{base}.index` pair, ordered by base offset. Each segment
//! then recovers its own next offset from its index, so the log resumes
//! appending exactly where the previous process stopped (given a clean
//! close). An empty directory gets a single segment at the configured
//! initial offset.
//!
//! ## Locking
//!
//! A reader-writer lock guards the segment list. `append`, `truncate`,
//! `close` and `remove` take the write half; `read`, `reader`,
//! `lowest_offset` and `highest_offset` share the read half. Offsets are
//! therefore assigned in a total order with no gaps, and a record is
//! visible to readers once its append has returned.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use strata_core::{Error, Record, Result};

use crate::config::LogConfig;
use crate::segment::Segment;
use crate::store::Store;

/// Append-only commit log over a directory of rolling segments.
pub struct Log {
    dir: PathBuf,
    config: LogConfig,
    /// Segments ordered by ascending base offset; the last one is active.
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Open the log at `dir`, creating the directory if needed and
    /// recovering any segments already present.
    pub fn open(dir: impl AsRef<Path>, mut config: LogConfig) -> Result<Self> {
        config.segment = config.segment.normalized();
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut base_offsets = BTreeSet::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            match base_offset_of(&path) {
                Some(base) => {
                    base_offsets.insert(base);
                }
                None => {
                    warn!(path = %path.display(), "skipping unrecognized file in log directory");
                }
            }
        }

        let mut segments = Vec::with_capacity(base_offsets.len().max(1));
        for base in base_offsets {
            segments.push(Segment::open(&dir, base, config.segment.clone())?);
        }
        if segments.is_empty() {
            segments.push(Segment::open(
                &dir,
                config.segment.initial_offset,
                config.segment.clone(),
            )?);
        }

        info!(
            dir = %dir.display(),
            segments = segments.len(),
            next_offset = segments.last().map(Segment::next_offset),
            "log opened"
        );

        Ok(Self {
            dir,
            config,
            segments: RwLock::new(segments),
        })
    }

    /// Append a record and return the offset it was assigned. Rolls to a
    /// new active segment after an append that fills the current one, so
    /// the filling record stays in the segment it filled.
    pub fn append(&self, record: Record) -> Result<u64> {
        let mut segments = self.segments.write();
        let active = segments
            .last_mut()
            .expect("log holds at least one segment");

        let offset = active.append(record)?;

        if active.is_maxed() {
            let base = offset + 1;
            debug!(base_offset = base, "active segment full, rolling over");
            segments.push(Segment::open(&self.dir, base, self.config.segment.clone())?);
        }

        Ok(offset)
    }

    /// Read the record at `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let segments = self.segments.read();
        let segment = segments
            .iter()
            .find(|s| s.contains(offset))
            .ok_or(Error::OffsetOutOfRange(offset))?;
        segment.read(offset)
    }

    /// Offset of the earliest record still in the log.
    pub fn lowest_offset(&self) -> u64 {
        let segments = self.segments.read();
        segments
            .first()
            .expect("log holds at least one segment")
            .base_offset()
    }

    /// Offset of the latest record in the log, or zero when nothing has
    /// ever been appended.
    pub fn highest_offset(&self) -> u64 {
        let segments = self.segments.read();
        let next = segments
            .last()
            .expect("log holds at least one segment")
            .next_offset();
        next.saturating_sub(1)
    }

    /// Remove every segment whose highest offset is at or below `lowest`.
    /// The active segment is always retained, so the log never ends up
    /// empty.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut segments = self.segments.write();

        // Segments are ordered, so the removable ones form a prefix.
        while segments.len() > 1 {
            let next = segments[0].next_offset();
            if next == 0 || next - 1 > lowest {
                break;
            }
            let segment = segments.remove(0);
            info!(
                base_offset = segment.base_offset(),
                lowest, "removing truncated segment"
            );
            segment.remove()?;
        }

        Ok(())
    }

    /// Sequential reader over the raw store bytes of every segment, in
    /// segment order. The stream is the on-disk format itself: length
    /// prefixes included, indexes excluded. Intended for snapshotting the
    /// log wholesale; it does not reflect appends made after the call.
    pub fn reader(&self) -> LogReader {
        let segments = self.segments.read();
        LogReader {
            stores: segments.iter().map(Segment::store).collect(),
            current: 0,
            pos: 0,
        }
    }

    /// Flush and close every segment. Consumes the log; reopen with
    /// [`Log::open`].
    pub fn close(self) -> Result<()> {
        let segments = self.segments.into_inner();
        for segment in segments {
            segment.close()?;
        }
        Ok(())
    }

    /// Close the log and delete its directory.
    pub fn remove(self) -> Result<()> {
        let dir = self.dir.clone();
        self.close()?;
        fs::remove_dir_all(&dir)?;
        info!(dir = %dir.display(), "log removed");
        Ok(())
    }

    /// Delete everything and reopen fresh with the same configuration.
    pub fn reset(self) -> Result<Log> {
        let dir = self.dir.clone();
        let config = self.config.clone();
        self.remove()?;
        Log::open(dir, config)
    }

    /// Directory this log lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Parse `{base}.store` / `{base}.index` into the base offset. Anything
/// else (including a non-numeric stem) is not part of the log.
fn base_offset_of(path: &Path) -> Option<u64> {
    let ext = path.extension()?.to_str()?;
    if ext != "store" && ext != "index" {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Concatenated byte stream over the stores of the segments that existed
/// when [`Log::reader`] was called. Holds its own store handles, so it
/// stays valid while the log rolls or truncates underneath it.
pub struct LogReader {
    stores: Vec<Arc<Store>>,
    current: usize,
    pos: u64,
}

impl io::Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current < self.stores.len() {
            let n = self.stores[self.current]
                .read_at(buf, self.pos)
                .map_err(|err| match err {
                    Error::Io(io_err) => io_err,
                    other => io::Error::new(io::ErrorKind::Other, other),
                })?;

            if n > 0 {
                self.pos += n as u64;
                return Ok(n);
            }

            self.current += 1;
            self.pos = 0;
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentConfig;
    use bytes::Bytes;
    use std::io::Read;
    use tempfile::TempDir;

    fn small_segment_config() -> LogConfig {
        LogConfig {
            segment: SegmentConfig {
                max_store_bytes: 32,
                ..Default::default()
            },
        }
    }

    fn hello() -> Record {
        Record::new(Bytes::from("hello world"))
    }

    #[test]
    fn test_append_read() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();

        let offset = log.append(hello()).unwrap();
        assert_eq!(offset, 0);

        let record = log.read(offset).unwrap();
        assert_eq!(record.offset, 0);
        assert_eq!(record.value, Bytes::from("hello world"));
    }

    #[test]
    fn test_offset_out_of_range() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();
        log.append(hello()).unwrap();

        let err = log.read(1).unwrap_err();
        assert!(matches!(err, Error::OffsetOutOfRange(1)));
    }

    #[test]
    fn test_offsets_are_gapless() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();

        for want in 0..10 {
            assert_eq!(log.append(hello()).unwrap(), want);
        }
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 9);
    }

    #[test]
    fn test_rollover_creates_segment_files() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();

        // Each record costs 21 store bytes; the 32-byte budget trips after
        // the second append of every segment.
        for _ in 0..4 {
            log.append(hello()).unwrap();
        }

        let stores: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "store"))
            .collect();
        assert_eq!(stores.len(), 3);

        for offset in 0..4 {
            assert_eq!(log.read(offset).unwrap().offset, offset);
        }
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let config = small_segment_config();

        let log = Log::open(dir.path(), config.clone()).unwrap();
        for _ in 0..3 {
            log.append(hello()).unwrap();
        }
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 2);
        log.close().unwrap();

        let log = Log::open(dir.path(), config).unwrap();
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 2);
        for offset in 0..3 {
            assert_eq!(log.read(offset).unwrap().offset, offset);
        }
        assert_eq!(log.append(hello()).unwrap(), 3);
    }

    #[test]
    fn test_reader_streams_store_format() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();
        log.append(hello()).unwrap();

        let mut bytes = Vec::new();
        log.reader().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 21);

        let len = u64::from_be_bytes(bytes[..8].try_into().unwrap());
        assert_eq!(len, 13);
        let record = Record::decode(&bytes[8..]).unwrap();
        assert_eq!(record.value, Bytes::from("hello world"));
    }

    #[test]
    fn test_reader_spans_segments() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();
        for _ in 0..4 {
            log.append(hello()).unwrap();
        }

        let mut bytes = Vec::new();
        log.reader().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 4 * 21);

        // Walk the concatenated stream record by record.
        for i in 0..4 {
            let at = i * 21;
            let len = u64::from_be_bytes(bytes[at..at + 8].try_into().unwrap());
            assert_eq!(len, 13);
            let record = Record::decode(&bytes[at + 8..at + 21]).unwrap();
            assert_eq!(record.offset, i as u64);
        }
    }

    #[test]
    fn test_truncate() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();
        for _ in 0..3 {
            log.append(hello()).unwrap();
        }

        log.truncate(1).unwrap();

        assert!(matches!(log.read(0), Err(Error::OffsetOutOfRange(0))));
        assert!(matches!(log.read(1), Err(Error::OffsetOutOfRange(1))));
        assert_eq!(log.read(2).unwrap().offset, 2);
        assert_eq!(log.lowest_offset(), 2);
    }

    #[test]
    fn test_truncate_never_removes_active_segment() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();
        for _ in 0..3 {
            log.append(hello()).unwrap();
        }

        log.truncate(u64::MAX).unwrap();

        // The active segment survives and appends keep their order.
        assert_eq!(log.append(hello()).unwrap(), 3);
        assert_eq!(log.read(3).unwrap().offset, 3);
    }

    #[test]
    fn test_index_budget_triggers_rollover() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            segment: SegmentConfig {
                max_store_bytes: 1024,
                max_index_bytes: 3 * crate::index::ENTRY_WIDTH,
                initial_offset: 0,
            },
        };
        let log = Log::open(dir.path(), config).unwrap();

        for want in 0..7 {
            assert_eq!(log.append(hello()).unwrap(), want);
        }
        for offset in 0..7 {
            assert_eq!(log.read(offset).unwrap().offset, offset);
        }
        log.close().unwrap();

        // Three entries per segment, so the fourth append of any segment
        // lands in a fresh one and no index ever passes its budget. After
        // close, each file holds exactly its used entries.
        let mut index_sizes: Vec<u64> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "index"))
            .map(|e| e.metadata().unwrap().len())
            .collect();
        index_sizes.sort_unstable();

        let entry = crate::index::ENTRY_WIDTH;
        assert_eq!(index_sizes, vec![entry, 3 * entry, 3 * entry]);
    }

    #[test]
    fn test_initial_offset() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            segment: SegmentConfig {
                initial_offset: 100,
                ..Default::default()
            },
        };
        let log = Log::open(dir.path(), config).unwrap();

        assert_eq!(log.append(hello()).unwrap(), 100);
        assert_eq!(log.lowest_offset(), 100);
        assert_eq!(log.highest_offset(), 100);
    }

    #[test]
    fn test_highest_offset_on_empty_log() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), LogConfig::default()).unwrap();
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 0);
    }

    #[test]
    fn test_reset() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_segment_config()).unwrap();
        for _ in 0..3 {
            log.append(hello()).unwrap();
        }

        let log = log.reset().unwrap();
        assert_eq!(log.highest_offset(), 0);
        assert_eq!(log.append(hello()).unwrap(), 0);
    }

    #[test]
    fn test_remove_deletes_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log");
        let log = Log::open(&path, LogConfig::default()).unwrap();
        log.append(hello()).unwrap();

        log.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_open_skips_foreign_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not a segment").unwrap();

        let log = Log::open(dir.path(), small_segment_config()).unwrap();
        assert_eq!(log.append(hello()).unwrap(), 0);
        assert_eq!(log.read(0).unwrap().offset, 0);
    }

    #[test]
    fn test_zero_config_gets_defaults() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            segment: SegmentConfig {
                max_store_bytes: 0,
                max_index_bytes: 0,
                initial_offset: 0,
            },
        };
        let log = Log::open(dir.path(), config).unwrap();

        // With 1024-byte defaults, a handful of appends stays in segment 0.
        for want in 0..10 {
            assert_eq!(log.append(hello()).unwrap(), want);
        }
        assert_eq!(log.lowest_offset(), 0);
    }
}
