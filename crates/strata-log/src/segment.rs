//! Log Segment
//!
//! A segment binds one store and one index under a shared base offset and
//! owns the protocol between absolute offsets (log-wide) and relative
//! offsets (index slots). The pair lives on disk as `{base}.store` and
//! `{base}.index`.
//!
//! On open, the segment recovers its `next_offset` from the last index
//! entry: `base + last_relative + 1` for a non-empty index, or `base` for a
//! fresh one. The store write happens before the index write on append, so
//! a crash between the two leaves an orphan store entry that no index slot
//! points at; it is invisible and harmless.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use strata_core::{Error, Record, Result};

use crate::config::SegmentConfig;
use crate::index::Index;
use crate::store::Store;

/// One store/index pair plus offset bookkeeping.
pub struct Segment {
    store: Arc<Store>,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
}

impl Segment {
    /// Open the segment with the given base offset inside `dir`, creating
    /// its files if they do not exist yet.
    pub fn open(dir: &Path, base_offset: u64, config: SegmentConfig) -> Result<Self> {
        let store = Arc::new(Store::open(dir.join(format!("{base_offset}.store")))?);
        let index = Index::open(dir.join(format!("{base_offset}.index")), &config)?;

        let next_offset = match index.read_last() {
            Ok((relative, _)) => base_offset + relative as u64 + 1,
            Err(Error::EndOfIndex) => base_offset,
            Err(err) => return Err(err),
        };

        Ok(Self {
            store,
            index,
            base_offset,
            next_offset,
            config,
        })
    }

    /// Append a record, stamping it with the next offset. Returns the
    /// offset the record was assigned.
    pub fn append(&mut self, mut record: Record) -> Result<u64> {
        let offset = self.next_offset;
        record.offset = offset;

        let encoded = record.encode();
        let (_, pos) = self.store.append(&encoded)?;
        self.index
            .write((offset - self.base_offset) as u32, pos)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Read the record at an absolute offset owned by this segment.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let (_, pos) = self.index.read_relative((offset - self.base_offset) as u32)?;
        let payload = self.store.read(pos)?;
        Record::decode(&payload)
    }

    /// Whether either file has reached its byte budget. The log checks this
    /// after each append and rolls to a new segment when it trips.
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() >= self.config.max_index_bytes
    }

    /// Whether `offset` falls inside this segment's half-open range.
    pub fn contains(&self, offset: u64) -> bool {
        self.base_offset <= offset && offset < self.next_offset
    }

    /// Absolute offset of the first record this segment holds (or would
    /// hold).
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Absolute offset the next append will receive.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Shared handle to the underlying store, for the log's bulk reader.
    pub(crate) fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    /// Close index then store. The index must go first so its
    /// truncate-to-used-size runs before the pair is considered closed.
    pub fn close(self) -> Result<()> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Close the segment and delete both files.
    pub fn remove(self) -> Result<()> {
        let index_path = self.index.path().to_path_buf();
        let store_path = self.store.path().to_path_buf();

        self.close()?;
        fs::remove_file(index_path)?;
        fs::remove_file(store_path)?;
        Ok(())
    }
}
