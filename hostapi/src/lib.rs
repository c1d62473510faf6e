//! `extbridge-hostapi`: host-side capability traits for the externs bridge.
//!
//! This crate defines what an embedding host must implement for the native
//! engine to reach chain and storage services through the dispatch layer:
//!
//! - `Externs`: randomness, consensus-fault verification, tipset lookup,
//!   and block storage (`Rand + Consensus + Chain + Blockstore`)
//! - `Blockstore`: content-addressed get/put/put-many/has/view
//! - `CallContext`: cancellation and deadline carried with each binding
//! - `BalanceSource`: actor balances for reservation funding checks
//! - `MemBlockstore`, `MemExterns`, `MemBalances`: in-memory implementations
//! - `BridgeLimits`: input limits enforced at the boundary
//! - `ExternsError`: host-side error type with `StatusCode` conversion

pub mod error;
pub mod types;
pub mod context;
pub mod blockstore;
pub mod traits;
pub mod balances;
pub mod mem_blockstore;
pub mod mem_externs;

// Re-export commonly used types at the crate root.
pub use error::ExternsError;
pub use types::BridgeLimits;
pub use context::CallContext;
pub use blockstore::Blockstore;
pub use traits::{Chain, Consensus, Externs, Rand};
pub use balances::{BalanceSource, MemBalances};
pub use mem_blockstore::MemBlockstore;
pub use mem_externs::MemExterns;
