//! Shared test helpers for integration tests.
//!
//! Provides logging setup, block keys, bridge factories, and externs that
//! misbehave on purpose (panicking, failing) used across all integration
//! test files.

#![allow(dead_code)]

use std::sync::Arc;

use extbridge_dispatch::{Bridge, BridgeConfig, Registry};
use extbridge_hostapi::{
    Blockstore, CallContext, Chain, Consensus, ExternsError, MemBalances, MemExterns, Rand,
};
use extbridge_primitives::{
    block_cid, encode_plan, ActorId, ChainEpoch, Cid, ConsensusFault, PlanEntry, Randomness,
    ReservationPlan, TokenAmount, RAW_CODEC,
};

/// Chain head used by every `MemExterns` built here.
pub const HEAD: ChainEpoch = 1_000;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── Keys ──

/// CID of a raw block holding `data`.
pub fn cid_of(data: &[u8]) -> Cid {
    block_cid(RAW_CODEC, data).unwrap()
}

/// Binary key of a raw block holding `data`.
pub fn key_of(data: &[u8]) -> Vec<u8> {
    cid_of(data).to_bytes()
}

// ── Bridges ──

/// A fresh bridge with one `MemExterns` registered.
pub fn mem_bridge() -> (Arc<Bridge>, Arc<MemExterns>, u64) {
    init_logging();
    let registry = Arc::new(Registry::new());
    let externs = Arc::new(MemExterns::new(HEAD));
    let handle = registry.register(CallContext::new(), externs.clone());
    let bridge = Arc::new(Bridge::new(registry, BridgeConfig::default()));
    (bridge, externs, handle)
}

/// A bridge that funds reservations from `balances`.
pub fn reserving_bridge(balances: Arc<MemBalances>, config: BridgeConfig) -> Arc<Bridge> {
    init_logging();
    Arc::new(Bridge::new(Arc::new(Registry::new()), config).with_balances(balances))
}

/// Balances: actor 100 holds 1000, actor 101 holds 500.
pub fn funded_balances() -> Arc<MemBalances> {
    let balances = MemBalances::new();
    balances.set_balance(100, 1_000);
    balances.set_balance(101, 500);
    Arc::new(balances)
}

/// Encode a reservation plan from `(actor, amount)` pairs.
pub fn plan(entries: &[(ActorId, TokenAmount)]) -> Vec<u8> {
    encode_plan(&ReservationPlan::new(
        entries
            .iter()
            .map(|&(actor, amount)| PlanEntry { actor, amount })
            .collect(),
    ))
}

// ── Misbehaving externs ──

/// Externs whose every capability panics.
pub struct PanickingExterns;

impl Rand for PanickingExterns {
    fn get_chain_randomness(&self, _: &CallContext, _: ChainEpoch) -> Result<Randomness, ExternsError> {
        panic!("chain randomness backend crashed")
    }

    fn get_beacon_randomness(&self, _: &CallContext, _: ChainEpoch) -> Result<Randomness, ExternsError> {
        panic!("beacon backend crashed")
    }
}

impl Consensus for PanickingExterns {
    fn verify_consensus_fault(
        &self,
        _: &CallContext,
        _: &[u8],
        _: &[u8],
        _: &[u8],
    ) -> Result<(Option<ConsensusFault>, i64), ExternsError> {
        panic!("header decoder crashed")
    }
}

impl Chain for PanickingExterns {
    fn get_tipset_cid(&self, _: &CallContext, _: ChainEpoch) -> Result<Cid, ExternsError> {
        panic!("tipset index crashed")
    }
}

impl Blockstore for PanickingExterns {
    fn get(&self, _: &CallContext, _: &Cid) -> Result<Option<Vec<u8>>, ExternsError> {
        panic!("blockstore get crashed")
    }

    fn put(&self, _: &CallContext, _: &Cid, _: &[u8]) -> Result<(), ExternsError> {
        panic!("blockstore put crashed")
    }
}

/// Externs whose every capability fails with an opaque backend error.
pub struct OfflineExterns;

fn offline() -> ExternsError {
    anyhow::anyhow!("backend offline").into()
}

impl Rand for OfflineExterns {
    fn get_chain_randomness(&self, _: &CallContext, _: ChainEpoch) -> Result<Randomness, ExternsError> {
        Err(offline())
    }

    fn get_beacon_randomness(&self, _: &CallContext, _: ChainEpoch) -> Result<Randomness, ExternsError> {
        Err(offline())
    }
}

impl Consensus for OfflineExterns {
    fn verify_consensus_fault(
        &self,
        _: &CallContext,
        _: &[u8],
        _: &[u8],
        _: &[u8],
    ) -> Result<(Option<ConsensusFault>, i64), ExternsError> {
        Err(offline())
    }
}

impl Chain for OfflineExterns {
    fn get_tipset_cid(&self, _: &CallContext, _: ChainEpoch) -> Result<Cid, ExternsError> {
        Err(offline())
    }
}

impl Blockstore for OfflineExterns {
    fn get(&self, _: &CallContext, _: &Cid) -> Result<Option<Vec<u8>>, ExternsError> {
        Err(offline())
    }

    fn put(&self, _: &CallContext, _: &Cid, _: &[u8]) -> Result<(), ExternsError> {
        Err(offline())
    }
}

/// A `MemExterns` whose blockstore answers a miss in `has` with
/// `NotFound` instead of `false`, as older stores do.
pub struct LegacyExterns(pub MemExterns);

impl Rand for LegacyExterns {
    fn get_chain_randomness(&self, ctx: &CallContext, epoch: ChainEpoch) -> Result<Randomness, ExternsError> {
        self.0.get_chain_randomness(ctx, epoch)
    }

    fn get_beacon_randomness(&self, ctx: &CallContext, epoch: ChainEpoch) -> Result<Randomness, ExternsError> {
        self.0.get_beacon_randomness(ctx, epoch)
    }
}

impl Consensus for LegacyExterns {
    fn verify_consensus_fault(
        &self,
        ctx: &CallContext,
        h1: &[u8],
        h2: &[u8],
        extra: &[u8],
    ) -> Result<(Option<ConsensusFault>, i64), ExternsError> {
        self.0.verify_consensus_fault(ctx, h1, h2, extra)
    }
}

impl Chain for LegacyExterns {
    fn get_tipset_cid(&self, ctx: &CallContext, epoch: ChainEpoch) -> Result<Cid, ExternsError> {
        self.0.get_tipset_cid(ctx, epoch)
    }
}

impl Blockstore for LegacyExterns {
    fn get(&self, ctx: &CallContext, k: &Cid) -> Result<Option<Vec<u8>>, ExternsError> {
        self.0.get(ctx, k)
    }

    fn put(&self, ctx: &CallContext, k: &Cid, block: &[u8]) -> Result<(), ExternsError> {
        self.0.put(ctx, k, block)
    }

    fn has(&self, ctx: &CallContext, k: &Cid) -> Result<bool, ExternsError> {
        match self.0.has(ctx, k)? {
            true => Ok(true),
            false => Err(ExternsError::NotFound),
        }
    }
}
