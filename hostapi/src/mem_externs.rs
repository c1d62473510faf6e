//! In-memory `Externs` for testing.
//!
//! `MemExterns` pairs a `MemBlockstore` with a synthetic chain: randomness
//! is derived deterministically from the epoch, tipset CIDs come from a
//! table, and consensus-fault verification returns a configured verdict.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use extbridge_primitives::{
    BlockRecord, ChainEpoch, Cid, ConsensusFault, Randomness,
};

use crate::blockstore::Blockstore;
use crate::context::CallContext;
use crate::error::ExternsError;
use crate::mem_blockstore::MemBlockstore;
use crate::traits::{Chain, Consensus, Rand};

const CHAIN_DOMAIN: &[u8] = b"extbridge/chain-randomness";
const BEACON_DOMAIN: &[u8] = b"extbridge/beacon-randomness";

/// In-memory capability set.
#[derive(Debug)]
pub struct MemExterns {
    store: MemBlockstore,
    head: ChainEpoch,
    tipsets: RwLock<BTreeMap<ChainEpoch, Cid>>,
    fault_verdict: RwLock<(Option<ConsensusFault>, i64)>,
}

impl Default for MemExterns {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MemExterns {
    /// Create externs whose chain head is at `head`.
    pub fn new(head: ChainEpoch) -> Self {
        Self {
            store: MemBlockstore::new(),
            head,
            tipsets: RwLock::new(BTreeMap::new()),
            fault_verdict: RwLock::new((None, 0)),
        }
    }

    /// The backing block store.
    pub fn store(&self) -> &MemBlockstore {
        &self.store
    }

    pub fn head(&self) -> ChainEpoch {
        self.head
    }

    /// Record the tipset CID for `epoch`.
    pub fn set_tipset(&self, epoch: ChainEpoch, cid: Cid) {
        self.tipsets.write().insert(epoch, cid);
    }

    /// Set the verdict returned by every `verify_consensus_fault` call.
    pub fn set_fault_verdict(&self, fault: Option<ConsensusFault>, gas_used: i64) {
        *self.fault_verdict.write() = (fault, gas_used);
    }

    fn lookback(&self, ctx: &CallContext, epoch: ChainEpoch) -> Result<(), ExternsError> {
        ctx.check()?;
        if epoch < 0 {
            return Err(ExternsError::InvalidArgument(format!("negative epoch {}", epoch)));
        }
        if epoch > self.head {
            return Err(ExternsError::other(format!(
                "epoch {} is beyond chain head {}",
                epoch, self.head
            )));
        }
        Ok(())
    }
}

fn derive_randomness(domain: &[u8], epoch: ChainEpoch) -> Randomness {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    hasher.update(&epoch.to_le_bytes());
    *hasher.finalize().as_bytes()
}

impl Rand for MemExterns {
    fn get_chain_randomness(
        &self,
        ctx: &CallContext,
        epoch: ChainEpoch,
    ) -> Result<Randomness, ExternsError> {
        self.lookback(ctx, epoch)?;
        Ok(derive_randomness(CHAIN_DOMAIN, epoch))
    }

    fn get_beacon_randomness(
        &self,
        ctx: &CallContext,
        epoch: ChainEpoch,
    ) -> Result<Randomness, ExternsError> {
        self.lookback(ctx, epoch)?;
        Ok(derive_randomness(BEACON_DOMAIN, epoch))
    }
}

impl Consensus for MemExterns {
    fn verify_consensus_fault(
        &self,
        ctx: &CallContext,
        _h1: &[u8],
        _h2: &[u8],
        _extra: &[u8],
    ) -> Result<(Option<ConsensusFault>, i64), ExternsError> {
        ctx.check()?;
        Ok(self.fault_verdict.read().clone())
    }
}

impl Chain for MemExterns {
    fn get_tipset_cid(&self, ctx: &CallContext, epoch: ChainEpoch) -> Result<Cid, ExternsError> {
        self.lookback(ctx, epoch)?;
        self.tipsets
            .read()
            .get(&epoch)
            .copied()
            .ok_or(ExternsError::NotFound)
    }
}

impl Blockstore for MemExterns {
    fn get(&self, ctx: &CallContext, k: &Cid) -> Result<Option<Vec<u8>>, ExternsError> {
        self.store.get(ctx, k)
    }

    fn put(&self, ctx: &CallContext, k: &Cid, block: &[u8]) -> Result<(), ExternsError> {
        self.store.put(ctx, k, block)
    }

    fn put_many(&self, ctx: &CallContext, blocks: Vec<BlockRecord>) -> Result<(), ExternsError> {
        self.store.put_many(ctx, blocks)
    }

    fn has(&self, ctx: &CallContext, k: &Cid) -> Result<bool, ExternsError> {
        self.store.has(ctx, k)
    }

    fn view(
        &self,
        ctx: &CallContext,
        k: &Cid,
        f: &mut dyn FnMut(&[u8]) -> Result<(), ExternsError>,
    ) -> Result<(), ExternsError> {
        self.store.view(ctx, k, f)
    }
}
