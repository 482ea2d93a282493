//! Record Data Structure
//!
//! This module defines the `Record` type, the unit of data in the commit log.
//!
//! ## Structure
//! Each record carries:
//! - **offset**: its position in the log, assigned by the log at append time
//! - **value**: the payload, arbitrary bytes the log never interprets
//!
//! ## Wire Encoding
//! Records are stored length-delimited:
//!
//! ```text
//! ┌───────────────┬──────────────────┬─────────────┐
//! │ offset varint │ value len varint │ value bytes │
//! └───────────────┴──────────────────┴─────────────┘
//! ```
//!
//! The encoding is self-describing within a known byte slice: `decode`
//! rejects a buffer whose trailing byte count disagrees with the declared
//! value length. The storage layer treats the encoded form as opaque; only
//! this module knows the layout.
//!
//! ## Design Decisions
//! - `bytes::Bytes` for the value, so slicing and cloning never copy
//! - offsets are u64; a log can outlive any practical record count

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::varint;

/// A single record in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Offset of this record in the log. Zero until the log assigns one.
    pub offset: u64,

    /// Payload bytes.
    pub value: Bytes,
}

impl Record {
    /// Create a record with no offset assigned yet.
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            offset: 0,
            value: value.into(),
        }
    }

    /// Number of bytes `encode` produces.
    pub fn encoded_len(&self) -> usize {
        varint::encoded_len(self.offset)
            + varint::encoded_len(self.value.len() as u64)
            + self.value.len()
    }

    /// Serialize into the length-delimited wire form.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        varint::encode_u64(&mut buf, self.offset);
        varint::encode_u64(&mut buf, self.value.len() as u64);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    /// Deserialize a record from its wire form.
    ///
    /// The slice must contain exactly one encoded record.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let offset = varint::decode_u64(&mut cursor)?;
        let len = varint::decode_u64(&mut cursor)? as usize;

        if cursor.remaining() != len {
            return Err(Error::InvalidRecord(format!(
                "declared value length {len} but {} bytes remain",
                cursor.remaining()
            )));
        }

        Ok(Self {
            offset,
            value: Bytes::copy_from_slice(cursor),
        })
    }
}
