//! Content-addressed block storage abstraction.
//!
//! `Blockstore` is the storage half of the `Externs` capability set. The
//! native engine reaches it through the dispatch layer's `blockstore_*`
//! entry points.
//!
//! Implementations:
//! - `MemBlockstore` (this crate): in-memory map for testing
//! - anything the embedding host backs with real storage

use extbridge_primitives::{BlockRecord, Cid};

use crate::context::CallContext;
use crate::error::ExternsError;

/// Abstraction over a content-addressed block store.
///
/// Methods take `&self`: a store is shared by every in-flight boundary call
/// on its handle, so implementations synchronise internally.
pub trait Blockstore: Send + Sync {
    /// Get a copy of the block stored under `k`.
    ///
    /// Returns `Ok(None)` if the block does not exist.
    fn get(&self, ctx: &CallContext, k: &Cid) -> Result<Option<Vec<u8>>, ExternsError>;

    /// Store `block` under `k`.
    ///
    /// The slice is only valid for the duration of the call; implementations
    /// that retain the block must copy it.
    fn put(&self, ctx: &CallContext, k: &Cid, block: &[u8]) -> Result<(), ExternsError>;

    /// Store a batch of blocks, in order.
    ///
    /// The default implementation puts blocks one at a time and stops at the
    /// first failure, so earlier blocks may already be stored. Backends that
    /// can commit a batch atomically should override this.
    fn put_many(&self, ctx: &CallContext, blocks: Vec<BlockRecord>) -> Result<(), ExternsError> {
        for record in &blocks {
            self.put(ctx, &record.cid, &record.data)?;
        }
        Ok(())
    }

    /// Check whether a block exists.
    ///
    /// Default implementation uses `get()`, but backends may optimize this.
    fn has(&self, ctx: &CallContext, k: &Cid) -> Result<bool, ExternsError> {
        Ok(self.get(ctx, k)?.is_some())
    }

    /// Pass the block stored under `k` to `f` without handing out ownership.
    ///
    /// The slice given to `f` is valid only during the callback. Returns
    /// `Err(NotFound)` when the block does not exist; errors returned by `f`
    /// are passed through unchanged.
    fn view(
        &self,
        ctx: &CallContext,
        k: &Cid,
        f: &mut dyn FnMut(&[u8]) -> Result<(), ExternsError>,
    ) -> Result<(), ExternsError> {
        match self.get(ctx, k)? {
            Some(block) => f(&block),
            None => Err(ExternsError::NotFound),
        }
    }
}
