//! Core types for the strata commit log.
//!
//! This crate holds the pieces shared by the storage engine and the service
//! layer: the [`Record`] unit of data, its wire encoding, and the workspace
//! error type.

pub mod error;
pub mod record;
pub mod varint;

pub use error::{Error, Result};
pub use record::Record;
