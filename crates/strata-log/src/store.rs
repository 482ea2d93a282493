//! Record Store
//!
//! The store is the data half of a segment: an append-only file of record
//! payloads, each preceded by an 8-byte big-endian length prefix.
//!
//! ## File Format
//!
//! ```text
//! ┌──────────────┬───────────┬──────────────┬───────────┬─────
//! │ len (u64 BE) │  payload  │ len (u64 BE) │  payload  │ ...
//! └──────────────┴───────────┴──────────────┴───────────┴─────
//! ```
//!
//! No separators, no trailer, no checksums. A record is addressed by the
//! byte position of its length prefix; that position is what the segment's
//! index records.
//!
//! ## Write Path
//!
//! Appends go through a buffered writer, so a burst of small records costs
//! one syscall per buffer flush instead of one per record. `size` tracks the
//! logical end of the file (buffered bytes included), which is why appends
//! can hand out positions without touching the file.
//!
//! ## Read Path
//!
//! Reads flush the buffer first so every appended byte is visible through
//! the file descriptor, then seek and read. The file is opened in append
//! mode, so moving the cursor for a read never redirects a write.
//!
//! All operations serialize through an internal mutex.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;

use strata_core::Result;

/// Width of the length prefix preceding every payload.
pub(crate) const LEN_WIDTH: u64 = 8;

struct StoreInner {
    buf: BufWriter<File>,
    size: u64,
}

/// Append-only, length-prefixed payload file.
pub struct Store {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

impl Store {
    /// Open the store file at `path`, creating it if absent. The size of an
    /// existing file is picked up from its metadata, which is how a reopened
    /// segment continues appending where it left off.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path,
            inner: Mutex::new(StoreInner {
                buf: BufWriter::new(file),
                size,
            }),
        })
    }

    /// Append a payload. Returns the number of bytes written (prefix
    /// included) and the byte position the record starts at.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        let pos = inner.size;

        inner.buf.write_all(&(payload.len() as u64).to_be_bytes())?;
        inner.buf.write_all(payload)?;

        let written = payload.len() as u64 + LEN_WIDTH;
        inner.size += written;
        Ok((written, pos))
    }

    /// Read the payload whose length prefix starts at `pos`.
    pub fn read(&self, pos: u64) -> Result<Bytes> {
        let mut inner = self.inner.lock();
        inner.buf.flush()?;

        let file = inner.buf.get_mut();
        file.seek(SeekFrom::Start(pos))?;

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        file.read_exact(&mut len_buf)?;
        let len = u64::from_be_bytes(len_buf);

        let mut payload = vec![0u8; len as usize];
        file.read_exact(&mut payload)?;
        Ok(Bytes::from(payload))
    }

    /// Read raw bytes starting at `off` into `buf`. Returns the number of
    /// bytes read; zero means `off` is at or past the end of the store.
    /// This is the bulk-reader entry point and makes no attempt to align
    /// with record boundaries.
    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let mut inner = self.inner.lock();
        inner.buf.flush()?;

        let file = inner.buf.get_mut();
        file.seek(SeekFrom::Start(off))?;
        let n = file.read(buf)?;
        Ok(n)
    }

    /// Logical size of the store in bytes, buffered writes included.
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Flush buffered writes. The descriptor itself is released when the
    /// last handle to this store drops.
    pub fn close(&self) -> Result<()> {
        self.inner.lock().buf.flush()?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
