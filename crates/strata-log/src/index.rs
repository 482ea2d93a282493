//! Offset Index
//!
//! The index is the lookup half of a segment: a memory-mapped table of
//! fixed 12-byte entries mapping a segment-relative record number to the
//! byte position of that record in the store.
//!
//! ## File Format
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┐
//! │ relative offset (4B) │ store position (8B)  │  × N, big endian,
//! └──────────────────────┴──────────────────────┘  packed from byte 0
//! ```
//!
//! ## Lifecycle
//!
//! While open, the backing file is sized up to `max_index_bytes` so the
//! mapping has room to grow; writes land in the mmap and `size` tracks the
//! used prefix. On close the mapping is flushed, the file fsynced and then
//! truncated back down to `size`. That final truncate is what makes
//! recovery work: the next open stats the file and the length alone tells
//! it where the last valid entry ends. After an unclean shutdown the file
//! is still padded to capacity and the stat-based recovery will see zero
//! entries in the padding (see the crate docs).
//!
//! ## Concurrency
//!
//! None internal. The index is only touched under the log's lock: writes
//! while the owning segment is mutated exclusively, reads under the shared
//! half.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use strata_core::{Error, Result};

use crate::config::SegmentConfig;

/// Width of the relative-offset column.
const REL_WIDTH: u64 = 4;
/// Width of a full index entry: 4-byte relative offset + 8-byte position.
pub(crate) const ENTRY_WIDTH: u64 = REL_WIDTH + 8;

/// Memory-mapped table of record positions for one segment.
pub struct Index {
    file: std::fs::File,
    path: PathBuf,
    mmap: MmapMut,
    size: u64,
}

impl Index {
    /// Open the index file at `path`, creating it if absent.
    ///
    /// The current file length is recorded as the used size before the file
    /// is grown to `max_index_bytes` for mapping, so an index closed cleanly
    /// resumes exactly at its last entry.
    pub fn open(path: impl AsRef<Path>, config: &SegmentConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let size = file.metadata()?.len();
        file.set_len(config.max_index_bytes)?;

        // SAFETY: the mapping is dropped before the file is truncated or
        // closed (see `close`), and the data directory is owned exclusively
        // by this process.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            file,
            path,
            mmap,
            size,
        })
    }

    /// Read the entry in slot `rel`. Returns the stored relative offset and
    /// store position, or [`Error::EndOfIndex`] when the slot lies past the
    /// used prefix.
    pub fn read_relative(&self, rel: u32) -> Result<(u32, u64)> {
        let entry_pos = rel as u64 * ENTRY_WIDTH;
        if self.size < entry_pos + ENTRY_WIDTH {
            return Err(Error::EndOfIndex);
        }

        let start = entry_pos as usize;
        let rel_bytes: [u8; 4] = self.mmap[start..start + REL_WIDTH as usize]
            .try_into()
            .unwrap();
        let pos_bytes: [u8; 8] = self.mmap[start + REL_WIDTH as usize..start + ENTRY_WIDTH as usize]
            .try_into()
            .unwrap();

        Ok((u32::from_be_bytes(rel_bytes), u64::from_be_bytes(pos_bytes)))
    }

    /// Read the last entry, or [`Error::EndOfIndex`] when the index is
    /// empty. Callers use the returned relative offset, not the slot number;
    /// after an unclean shutdown the two can disagree.
    pub fn read_last(&self) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(Error::EndOfIndex);
        }
        self.read_relative((self.size / ENTRY_WIDTH - 1) as u32)
    }

    /// Append an entry. Fails with [`Error::EndOfIndex`] when the mapped
    /// capacity has no room left, which is the signal to roll the segment.
    pub fn write(&mut self, rel: u32, pos: u64) -> Result<()> {
        if (self.mmap.len() as u64) < self.size + ENTRY_WIDTH {
            return Err(Error::EndOfIndex);
        }

        let start = self.size as usize;
        self.mmap[start..start + REL_WIDTH as usize].copy_from_slice(&rel.to_be_bytes());
        self.mmap[start + REL_WIDTH as usize..start + ENTRY_WIDTH as usize]
            .copy_from_slice(&pos.to_be_bytes());

        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Used size of the index in bytes (always a multiple of the entry
    /// width after a clean lifecycle).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the mapping, sync the file, and truncate it to the used size.
    ///
    /// The order matters: the mmap must reach the file before fsync, and
    /// the mapping must be gone before the file shrinks under it. The final
    /// truncate is what stat-based recovery depends on.
    pub fn close(self) -> Result<()> {
        let Index {
            file, mmap, size, ..
        } = self;

        mmap.flush()?;
        file.sync_all()?;
        drop(mmap);
        file.set_len(size)?;
        Ok(())
    }
}
