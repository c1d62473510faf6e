//! Reservation session.
//!
//! A single slot that is either `Closed` or `Open` with a ledger of the
//! amounts reserved per actor. A session brackets one unit of execution:
//!
//! ```text
//! Closed --begin(plan) ok--> Open --consume/refund--> Open --end, all consumed--> Closed
//! ```
//!
//! Every failure is reported as a [`ReservationError`] carrying a
//! [`ReservationStatus`] and a diagnostic message. A failed `begin` never
//! changes the slot. A failed `end` leaves the session open.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use extbridge_hostapi::BalanceSource;
use extbridge_primitives::{decode_plan, ActorId, ReservationPlan, ReservationStatus, TokenAmount};

/// A non-`Ok` reservation outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ReservationError {
    pub status: ReservationStatus,
    pub message: String,
}

impl ReservationError {
    pub fn new(status: ReservationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    fn invariant(message: impl Into<String>) -> Self {
        Self::new(ReservationStatus::InvariantViolation, message)
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reserved {
    amount: TokenAmount,
    remaining: TokenAmount,
}

#[derive(Debug, Default)]
struct Ledger {
    actors: BTreeMap<ActorId, Reserved>,
}

impl Ledger {
    fn entry(&mut self, actor: ActorId) -> ReservationResult<&mut Reserved> {
        self.actors
            .get_mut(&actor)
            .ok_or_else(|| ReservationError::invariant(format!("actor {} has no reservation", actor)))
    }

    fn remaining_total(&self) -> Option<TokenAmount> {
        self.actors
            .values()
            .try_fold(0u128, |acc, r| acc.checked_add(r.remaining))
    }
}

/// The reservation slot.
#[derive(Debug, Default)]
pub struct ReservationSession {
    slot: Mutex<Option<Ledger>>,
}

impl ReservationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Remaining reserved amount for `actor`; `None` when closed or unknown.
    pub fn remaining(&self, actor: ActorId) -> Option<TokenAmount> {
        self.slot
            .lock()
            .as_ref()
            .and_then(|ledger| ledger.actors.get(&actor).map(|r| r.remaining))
    }

    /// Open a session from an encoded plan.
    ///
    /// An empty encoding is a no-op. The slot stays locked while balances
    /// are checked, so of two concurrent begins exactly one can succeed.
    pub fn begin(&self, plan: &[u8], balances: &dyn BalanceSource) -> ReservationResult<()> {
        if plan.is_empty() {
            return Ok(());
        }

        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(ReservationError::new(
                ReservationStatus::SessionOpen,
                "reservation session already open",
            ));
        }

        let plan = decode_plan(plan)
            .map_err(|e| ReservationError::invariant(format!("malformed reservation plan: {}", e)))?;
        if plan.is_empty() {
            return Ok(());
        }
        let ledger = fund(&plan, balances)?;

        log::debug!(
            "reservation session opened for {} actors",
            ledger.actors.len()
        );
        *slot = Some(ledger);
        Ok(())
    }

    /// Spend `amount` of `actor`'s reservation.
    pub fn consume(&self, actor: ActorId, amount: TokenAmount) -> ReservationResult<()> {
        let mut slot = self.slot.lock();
        let ledger = open_ledger(&mut slot)?;
        let reserved = ledger.entry(actor)?;
        let current = reserved.remaining;
        reserved.remaining = current.checked_sub(amount).ok_or_else(|| {
            ReservationError::invariant(format!(
                "actor {} consumed {} with only {} remaining",
                actor, amount, current
            ))
        })?;
        Ok(())
    }

    /// Return `amount` to `actor`'s reservation.
    ///
    /// The remaining amount can never grow past what was reserved.
    pub fn refund(&self, actor: ActorId, amount: TokenAmount) -> ReservationResult<()> {
        let mut slot = self.slot.lock();
        let ledger = open_ledger(&mut slot)?;
        let reserved = ledger.entry(actor)?;
        let remaining = reserved.remaining.checked_add(amount).ok_or_else(|| {
            ReservationError::new(
                ReservationStatus::Overflow,
                format!("refund of {} to actor {} overflows", amount, actor),
            )
        })?;
        if remaining > reserved.amount {
            return Err(ReservationError::invariant(format!(
                "refund of {} to actor {} exceeds its reservation of {}",
                amount, actor, reserved.amount
            )));
        }
        reserved.remaining = remaining;
        Ok(())
    }

    /// Close the session. Everything reserved must have been consumed.
    pub fn end(&self) -> ReservationResult<()> {
        let mut slot = self.slot.lock();
        let ledger = open_ledger(&mut slot)?;

        let leftover = ledger.remaining_total().ok_or_else(|| {
            ReservationError::new(ReservationStatus::Overflow, "remaining total overflows")
        })?;
        if leftover != 0 {
            let actors: Vec<String> = ledger
                .actors
                .iter()
                .filter(|(_, r)| r.remaining != 0)
                .map(|(actor, r)| format!("{}={}", actor, r.remaining))
                .collect();
            return Err(ReservationError::new(
                ReservationStatus::NonZeroRemainder,
                format!("unconsumed reservations: {}", actors.join(", ")),
            ));
        }

        *slot = None;
        log::debug!("reservation session closed");
        Ok(())
    }
}

fn open_ledger(slot: &mut Option<Ledger>) -> ReservationResult<&mut Ledger> {
    slot.as_mut().ok_or_else(|| {
        ReservationError::new(ReservationStatus::SessionClosed, "no reservation session open")
    })
}

fn fund(plan: &ReservationPlan, balances: &dyn BalanceSource) -> ReservationResult<Ledger> {
    if plan.total().is_none() {
        return Err(ReservationError::new(
            ReservationStatus::Overflow,
            "reservation plan total overflows",
        ));
    }

    let mut ledger = Ledger::default();
    for entry in &plan.entries {
        let balance = balances
            .balance_of(entry.actor)
            .map_err(|e| {
                ReservationError::invariant(format!(
                    "balance lookup for actor {} failed: {}",
                    entry.actor, e
                ))
            })?
            .unwrap_or(0);
        if balance < entry.amount {
            return Err(ReservationError::new(
                ReservationStatus::InsufficientFunds,
                format!(
                    "actor {} has balance {} but reserves {}",
                    entry.actor, balance, entry.amount
                ),
            ));
        }
        ledger.actors.insert(
            entry.actor,
            Reserved {
                amount: entry.amount,
                remaining: entry.amount,
            },
        );
    }
    Ok(ledger)
}
