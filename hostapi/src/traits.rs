//! The capability set a host must provide to the native engine.
//!
//! The engine cannot reach chain history, the beacon, or block storage on
//! its own; it calls back through the dispatch layer, which resolves a
//! handle to an `Externs` implementation and invokes one of these methods.
//! Every method receives the `CallContext` registered with the handle.

use extbridge_primitives::{ChainEpoch, Cid, ConsensusFault, Randomness};

use crate::blockstore::Blockstore;
use crate::context::CallContext;
use crate::error::ExternsError;

/// Randomness provider.
pub trait Rand {
    /// 32 bytes of randomness from the ticket chain at `epoch`.
    fn get_chain_randomness(
        &self,
        ctx: &CallContext,
        epoch: ChainEpoch,
    ) -> Result<Randomness, ExternsError>;

    /// 32 bytes of randomness from the beacon entry at `epoch`.
    fn get_beacon_randomness(
        &self,
        ctx: &CallContext,
        epoch: ChainEpoch,
    ) -> Result<Randomness, ExternsError>;
}

/// Consensus related methods.
pub trait Consensus {
    /// Verify a consensus fault from two block headers and extra evidence.
    ///
    /// Returns the fault (if any) and the gas consumed by verification. Gas
    /// is reported for every verdict, including "no fault".
    fn verify_consensus_fault(
        &self,
        ctx: &CallContext,
        h1: &[u8],
        h2: &[u8],
        extra: &[u8],
    ) -> Result<(Option<ConsensusFault>, i64), ExternsError>;
}

/// Chain lookups.
pub trait Chain {
    /// The CID of the tipset at `epoch`.
    fn get_tipset_cid(&self, ctx: &CallContext, epoch: ChainEpoch) -> Result<Cid, ExternsError>;
}

/// The full capability set registered behind a handle.
pub trait Externs: Rand + Consensus + Chain + Blockstore {}

impl<T> Externs for T where T: Rand + Consensus + Chain + Blockstore {}
