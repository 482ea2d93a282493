//! Strata Storage Engine
//!
//! This crate implements the persistent commit log: a durable, ordered
//! sequence of records addressed by monotonically increasing offsets.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                     Log                       │
//! │   directory scan · offset routing · rollover  │
//! └──────────────┬────────────────────────────────┘
//!                │ ordered segments, last is active
//!                ▼
//! ┌───────────────────────────────────────────────┐
//! │                   Segment                     │
//! │      absolute ↔ relative offset protocol      │
//! └───────┬───────────────────────────┬───────────┘
//!         │                           │
//!         ▼                           ▼
//! ┌───────────────┐          ┌─────────────────┐
//! │     Store     │          │      Index      │
//! │ {base}.store  │          │  {base}.index   │
//! │ len ‖ payload │          │ mmap slot table │
//! └───────────────┘          └─────────────────┘
//! ```
//!
//! Each segment pairs an append-only store file holding length-prefixed
//! record payloads with a memory-mapped index mapping segment-relative
//! record numbers to byte positions in the store. The log routes appends to
//! the active (last) segment and rolls to a new one when either file reaches
//! its configured byte budget.
//!
//! ## Concurrency
//!
//! The engine is synchronous; all I/O blocks. The log serializes mutations
//! (`append`, `truncate`) behind the write half of a `RwLock` and lets reads
//! share the read half. The store additionally guards its buffered writer
//! with an internal mutex so random reads (which must flush) cannot
//! interleave with appends.
//!
//! ## Durability
//!
//! Appends land in a buffered writer and become visible to readers no later
//! than the next read (reads flush first). The index is truncated to its
//! used size on close so the next open can recover the entry count from the
//! file length alone. Recovery after an unclean shutdown is best-effort:
//! the index file will still be padded to its slot capacity and the
//! recovered tail reads as a zero entry.

pub mod config;
mod index;
mod log;
mod segment;
mod store;

pub use config::{LogConfig, SegmentConfig};
pub use log::{Log, LogReader};
pub use segment::Segment;

pub use strata_core::{Error, Record, Result};
