//! Log Configuration
//!
//! Sizing policy for segments. A segment rolls when either of its two files
//! reaches the configured byte budget, so these two knobs bound how much
//! data a single `{base}.store`/`{base}.index` pair can hold:
//!
//! - **max_store_bytes**: byte budget for the store file (default: 1024)
//! - **max_index_bytes**: byte budget for the index file (default: 1024);
//!   also the slot capacity the index file is sized to while open, so it
//!   bounds the record count per segment at `max_index_bytes / 12`
//! - **initial_offset**: base offset of the first segment created in an
//!   empty directory (default: 0)
//!
//! Zero-valued byte budgets mean "use the default" and are normalized when
//! the log opens. A zero `initial_offset` is a real value, not a default
//! marker.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a [`crate::Log`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Segment sizing policy.
    #[serde(default)]
    pub segment: SegmentConfig,
}

/// Sizing policy for individual segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Maximum store file size in bytes before the segment rolls.
    #[serde(default = "default_max_store_bytes")]
    pub max_store_bytes: u64,

    /// Maximum index file size in bytes before the segment rolls.
    #[serde(default = "default_max_index_bytes")]
    pub max_index_bytes: u64,

    /// Base offset for the first segment of a fresh log.
    #[serde(default)]
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: default_max_store_bytes(),
            max_index_bytes: default_max_index_bytes(),
            initial_offset: 0,
        }
    }
}

impl SegmentConfig {
    /// Replace zero byte budgets with their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.max_store_bytes == 0 {
            self.max_store_bytes = default_max_store_bytes();
        }
        if self.max_index_bytes == 0 {
            self.max_index_bytes = default_max_index_bytes();
        }
        self
    }
}

fn default_max_store_bytes() -> u64 {
    1024
}

fn default_max_index_bytes() -> u64 {
    1024
}
