//! Consensus fault types.

use crate::address::Address;
use crate::types::ChainEpoch;

/// Kind of consensus fault. `None` is only used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum ConsensusFaultType {
    None = 0,
    DoubleForkMining = 1,
    ParentGrinding = 2,
    TimeOffsetMining = 3,
}

impl ConsensusFaultType {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::DoubleForkMining),
            2 => Some(Self::ParentGrinding),
            3 => Some(Self::TimeOffsetMining),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

/// A verified consensus fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusFault {
    /// Address of the miner at fault.
    pub target: Address,
    /// Epoch of the fault: the higher epoch of the two blocks causing it.
    pub epoch: ChainEpoch,
    /// Kind of fault.
    pub fault_type: ConsensusFaultType,
}

/// Flattened verification result as reported across the boundary.
///
/// `gas_used` is always populated, whatever the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultReport {
    pub fault_type: i64,
    pub miner_id: u64,
    pub epoch: ChainEpoch,
    pub gas_used: i64,
}
