//! Actor balance lookups backing reservation funding checks.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use extbridge_primitives::{ActorId, TokenAmount};

use crate::error::ExternsError;

/// Source of actor balances consulted when a reservation session opens.
pub trait BalanceSource: Send + Sync {
    /// Current balance of `actor`, `Ok(None)` if the actor does not exist.
    fn balance_of(&self, actor: ActorId) -> Result<Option<TokenAmount>, ExternsError>;
}

/// In-memory balance table for testing.
#[derive(Debug, Default)]
pub struct MemBalances {
    balances: RwLock<BTreeMap<ActorId, TokenAmount>>,
}

impl MemBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, actor: ActorId, amount: TokenAmount) {
        self.balances.write().insert(actor, amount);
    }
}

impl BalanceSource for MemBalances {
    fn balance_of(&self, actor: ActorId) -> Result<Option<TokenAmount>, ExternsError> {
        Ok(self.balances.read().get(&actor).copied())
    }
}
