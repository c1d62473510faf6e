//! Host-side limits for the externs bridge.
//!
//! `BridgeLimits` bounds what the dispatch layer will accept from the native
//! engine before any capability is invoked.

use extbridge_primitives::{BatchLimits, MAX_CID_LEN};

/// Absolute ceiling on a single declared length (1 GiB).
pub const MAX_DECLARED_LEN: usize = 1 << 30;

/// Input limits enforced at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeLimits {
    /// Maximum declared length of one put-many record.
    pub max_record_len: usize,
    /// Maximum number of records in one put-many batch.
    pub max_batch_records: usize,
    /// Maximum length of a single block passed to `put`.
    pub max_block_len: usize,
    /// Maximum length of a block key.
    pub max_key_len: usize,
}

impl Default for BridgeLimits {
    fn default() -> Self {
        Self {
            max_record_len: MAX_DECLARED_LEN,
            max_batch_records: 64 << 10,
            max_block_len: MAX_DECLARED_LEN,
            max_key_len: MAX_CID_LEN,
        }
    }
}

impl BridgeLimits {
    /// The subset of limits used by the put-many decoder.
    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            max_record_len: self.max_record_len,
            max_records: self.max_batch_records,
        }
    }
}
