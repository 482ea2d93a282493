//! Error Types for Strata
//!
//! This module defines the errors the commit log can produce.
//!
//! ## Error Categories
//!
//! ### I/O Errors
//! - `Io`: any filesystem or mmap failure, propagated unchanged
//!
//! ### Lookup Errors
//! - `OffsetOutOfRange`: the requested offset is not owned by any live
//!   segment. This is the only error the service layer turns into a
//!   structured client-facing status.
//!
//! ### Internal Signaling
//! - `EndOfIndex`: an index slot is unreadable (empty or past the used size)
//!   or unwritable (no slot capacity left). The segment and log handle this
//!   locally: an empty index means "fresh segment", a full index means "roll
//!   over". It should not normally escape the log crate.
//!
//! ### Data Errors
//! - `InvalidRecord`: a store payload failed to decode back into a record.
//!   Does not occur without on-disk corruption; the format carries no
//!   checksums, so this is the only corruption signal the core has.
//!
//! ## Usage
//! All fallible functions in the workspace return `Result<T>`, aliased to
//! `Result<T, Error>`, so errors propagate with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("offset out of range: {0}")]
    OffsetOutOfRange(u64),

    #[error("end of index")]
    EndOfIndex,

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
