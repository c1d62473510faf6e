//! Safe dispatch entry points.
//!
//! `Bridge` owns the handle registry, the boundary limits, and the
//! reservation session. Each handle-taking method follows the same path:
//!
//! 1. Resolve the handle (`InvalidHandle` if unknown; nothing else runs).
//! 2. Decode and bound-check inputs (`InvalidArgument` before any mutation).
//! 3. Check the binding's `CallContext`.
//! 4. Invoke the capability with the binding's context.
//! 5. Map the outcome; a panic anywhere in 1-4 becomes `Panic`.
//!
//! The `extern "C"` surface in [`crate::ffi`] only validates raw pointers
//! and delegates here.

use std::sync::Arc;

use extbridge_hostapi::{BalanceSource, Blockstore, Chain, Consensus, Externs, ExternsError, Rand};
use extbridge_primitives::{
    decode_cid, decode_put_many, ActorId, ChainEpoch, Cid, ConsensusFaultType, FaultReport,
    Randomness, ReservationStatus, StatusCode, TokenAmount,
};

use crate::config::BridgeConfig;
use crate::containment::{catch, contain};
use crate::error::{BridgeError, BridgeResult};
use crate::memory::OwnedBuffer;
use crate::registry::{Binding, Registry};
use crate::reservation::{ReservationError, ReservationResult, ReservationSession};

/// The dispatch layer for one native engine.
pub struct Bridge {
    registry: Arc<Registry>,
    config: BridgeConfig,
    session: ReservationSession,
    balances: Option<Arc<dyn BalanceSource>>,
}

impl Bridge {
    pub fn new(registry: Arc<Registry>, config: BridgeConfig) -> Self {
        Self {
            registry,
            config,
            session: ReservationSession::new(),
            balances: None,
        }
    }

    /// Attach the balance source reservation sessions are funded from.
    pub fn with_balances(mut self, balances: Arc<dyn BalanceSource>) -> Self {
        self.balances = Some(balances);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn session(&self) -> &ReservationSession {
        &self.session
    }

    /// Fail with `InvalidHandle` unless `handle` is currently registered.
    pub fn ensure_handle(&self, handle: u64) -> BridgeResult<()> {
        self.resolve(handle).map(|_| ())
    }

    fn resolve(&self, handle: u64) -> BridgeResult<Binding> {
        self.registry
            .lookup(handle)
            .ok_or(BridgeError::InvalidHandle(handle))
    }

    /// Run one dispatch call that takes no encoded input.
    fn dispatch<T>(
        &self,
        op: &'static str,
        handle: u64,
        invoke: impl FnOnce(&dyn Externs, &Binding) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        self.dispatch_with(op, handle, || Ok(()), |externs, binding, ()| invoke(externs, binding))
    }

    /// Run one dispatch call against the binding behind `handle`, decoding
    /// its input before the call context is consulted.
    fn dispatch_with<I, T>(
        &self,
        op: &'static str,
        handle: u64,
        decode: impl FnOnce() -> BridgeResult<I>,
        invoke: impl FnOnce(&dyn Externs, &Binding, I) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        let result = contain(op, || {
            let binding = self.resolve(handle)?;
            let input = decode()?;
            binding.context.check()?;
            invoke(binding.externs.as_ref(), &binding, input)
        });
        if let Err(e) = &result {
            match e.status() {
                StatusCode::NotFound => log::debug!("{} on handle {}: {}", op, handle, e),
                // Already logged with its backtrace.
                StatusCode::Panic => {}
                _ => log::warn!("{} on handle {} failed: {}", op, handle, e),
            }
        }
        result
    }

    fn decode_key(&self, key: &[u8]) -> BridgeResult<Cid> {
        let max = self.config.limits.max_key_len;
        if key.len() > max {
            return Err(BridgeError::invalid_argument(format!(
                "key of {} bytes exceeds limit {}",
                key.len(),
                max
            )));
        }
        Ok(decode_cid(key)?)
    }

    // ── Randomness ──

    pub fn get_chain_randomness(&self, handle: u64, epoch: ChainEpoch) -> BridgeResult<Randomness> {
        self.dispatch("get_chain_randomness", handle, |externs, binding| {
            Ok(externs.get_chain_randomness(&binding.context, epoch)?)
        })
    }

    pub fn get_beacon_randomness(&self, handle: u64, epoch: ChainEpoch) -> BridgeResult<Randomness> {
        self.dispatch("get_beacon_randomness", handle, |externs, binding| {
            Ok(externs.get_beacon_randomness(&binding.context, epoch)?)
        })
    }

    // ── Consensus ──

    /// Verify a consensus fault and flatten the verdict.
    ///
    /// When a fault is found but its target cannot be resolved, the error
    /// still carries the fault type and gas used.
    pub fn verify_consensus_fault(
        &self,
        handle: u64,
        h1: &[u8],
        h2: &[u8],
        extra: &[u8],
    ) -> BridgeResult<FaultReport> {
        self.dispatch("verify_consensus_fault", handle, |externs, binding| {
            let (fault, gas_used) =
                externs.verify_consensus_fault(&binding.context, h1, h2, extra)?;
            let mut report = FaultReport {
                gas_used,
                ..FaultReport::default()
            };
            let fault = match fault {
                Some(fault) if fault.fault_type != ConsensusFaultType::None => fault,
                _ => return Ok(report),
            };
            report.fault_type = fault.fault_type.as_i64();
            let miner_id = fault
                .target
                .id()
                .map_err(|source| BridgeError::UnresolvedTarget { report, source })?;
            report.miner_id = miner_id;
            report.epoch = fault.epoch;
            Ok(report)
        })
    }

    // ── Chain ──

    /// Write the binary CID of the tipset at `epoch` into `out`.
    ///
    /// Returns the number of bytes written. `InvalidArgument` if `out` is
    /// too small.
    pub fn get_tipset_cid(&self, handle: u64, epoch: ChainEpoch, out: &mut [u8]) -> BridgeResult<usize> {
        self.dispatch("get_tipset_cid", handle, |externs, binding| {
            let cid = externs.get_tipset_cid(&binding.context, epoch)?;
            let bytes = cid.to_bytes();
            let capacity = out.len();
            let dst = out.get_mut(..bytes.len()).ok_or_else(|| {
                BridgeError::invalid_argument(format!(
                    "tipset cid of {} bytes does not fit output of {} bytes",
                    bytes.len(),
                    capacity
                ))
            })?;
            dst.copy_from_slice(&bytes);
            Ok(bytes.len())
        })
    }

    // ── Blockstore ──

    /// Fetch a copy of the block under `key`.
    pub fn blockstore_get(&self, handle: u64, key: &[u8]) -> BridgeResult<OwnedBuffer> {
        self.dispatch_with(
            "blockstore_get",
            handle,
            || self.decode_key(key),
            |externs, binding, cid| {
                let mut found = None;
                externs.view(&binding.context, &cid, &mut |block: &[u8]| {
                    found = Some(OwnedBuffer::copy_from(block));
                    Ok(())
                })?;
                found.ok_or(BridgeError::Externs(ExternsError::NotFound))
            },
        )
    }

    pub fn blockstore_put(&self, handle: u64, key: &[u8], block: &[u8]) -> BridgeResult<()> {
        self.dispatch_with(
            "blockstore_put",
            handle,
            || {
                let cid = self.decode_key(key)?;
                let max = self.config.limits.max_block_len;
                if block.len() > max {
                    return Err(BridgeError::invalid_argument(format!(
                        "block of {} bytes exceeds limit {}",
                        block.len(),
                        max
                    )));
                }
                Ok(cid)
            },
            |externs, binding, cid| Ok(externs.put(&binding.context, &cid, block)?),
        )
    }

    /// Decode a put-many batch and submit it in one call.
    ///
    /// Nothing is submitted unless every record decodes.
    pub fn blockstore_put_many(&self, handle: u64, lengths: &[i32], buf: &[u8]) -> BridgeResult<()> {
        self.dispatch_with(
            "blockstore_put_many",
            handle,
            || Ok(decode_put_many(lengths, buf, self.config.limits.batch_limits())?),
            |externs, binding, records| {
                if records.is_empty() {
                    return Ok(());
                }
                log::debug!("submitting batch of {} blocks", records.len());
                Ok(externs.put_many(&binding.context, records)?)
            },
        )
    }

    /// Whether the store holds `key`. A store answering `NotFound` counts
    /// as a plain miss.
    pub fn blockstore_has(&self, handle: u64, key: &[u8]) -> BridgeResult<bool> {
        self.dispatch_with(
            "blockstore_has",
            handle,
            || self.decode_key(key),
            |externs, binding, cid| match externs.has(&binding.context, &cid) {
                Ok(found) => Ok(found),
                Err(ExternsError::NotFound) => Ok(false),
                Err(e) => Err(e.into()),
            },
        )
    }

    /// Lend the block under `key` to `f` without copying it out.
    ///
    /// The slice is only valid inside `f`.
    pub fn blockstore_view<F>(&self, handle: u64, key: &[u8], mut f: F) -> BridgeResult<()>
    where
        F: FnMut(&[u8]),
    {
        self.dispatch_with(
            "blockstore_view",
            handle,
            || self.decode_key(key),
            |externs, binding, cid| {
                Ok(externs.view(&binding.context, &cid, &mut |block: &[u8]| {
                    f(block);
                    Ok(())
                })?)
            },
        )
    }

    // ── Reservations ──

    fn reserve<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&ReservationSession) -> ReservationResult<T>,
    ) -> ReservationResult<T> {
        let result = match catch(op, || f(&self.session)) {
            Ok(result) => result,
            Err(message) => Err(ReservationError::new(
                ReservationStatus::InvariantViolation,
                format!("panic in {}: {}", op, message),
            )),
        };
        if let Err(e) = &result {
            log::warn!("{} failed: {}", op, e);
        }
        result
    }

    /// Open a reservation session from an encoded plan.
    ///
    /// An empty plan is a no-op whether or not reservations are supported.
    pub fn begin_reservations(&self, plan: &[u8]) -> ReservationResult<()> {
        self.reserve("begin_reservations", |session| {
            if plan.is_empty() {
                return Ok(());
            }
            let balances = match &self.balances {
                Some(balances) if self.config.reservations_enabled => balances,
                _ => {
                    return Err(ReservationError::new(
                        ReservationStatus::NotImplemented,
                        "reservations are not supported by this host",
                    ))
                }
            };
            if plan.len() > self.config.max_plan_bytes {
                return Err(ReservationError::new(
                    ReservationStatus::PlanTooLarge,
                    format!(
                        "plan of {} bytes exceeds limit {}",
                        plan.len(),
                        self.config.max_plan_bytes
                    ),
                ));
            }
            session.begin(plan, balances.as_ref())
        })
    }

    pub fn end_reservations(&self) -> ReservationResult<()> {
        self.reserve("end_reservations", |session| session.end())
    }

    pub fn consume_reservation(&self, actor: ActorId, amount: TokenAmount) -> ReservationResult<()> {
        self.reserve("consume_reservation", |session| session.consume(actor, amount))
    }

    pub fn refund_reservation(&self, actor: ActorId, amount: TokenAmount) -> ReservationResult<()> {
        self.reserve("refund_reservation", |session| session.refund(actor, amount))
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
