//! In-memory block store for testing.
//!
//! `MemBlockstore` implements `Blockstore` using a `BTreeMap` behind a
//! `parking_lot::RwLock`. Useful for unit tests and integration tests where
//! a real storage backend is not needed.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use extbridge_primitives::{BlockRecord, Cid};

use crate::blockstore::Blockstore;
use crate::context::CallContext;
use crate::error::ExternsError;

/// In-memory block store backed by `BTreeMap`.
///
/// `put_many` applies the whole batch under one write lock: readers see
/// either none or all of it.
#[derive(Debug, Default)]
pub struct MemBlockstore {
    blocks: RwLock<BTreeMap<Cid, Vec<u8>>>,
}

impl MemBlockstore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with blocks.
    pub fn with_blocks(blocks: BTreeMap<Cid, Vec<u8>>) -> Self {
        Self {
            blocks: RwLock::new(blocks),
        }
    }

    /// Insert a block directly, bypassing the call context.
    pub fn insert(&self, k: Cid, block: Vec<u8>) {
        self.blocks.write().insert(k, block);
    }

    /// Remove a block.
    pub fn remove(&self, k: &Cid) {
        self.blocks.write().remove(k);
    }

    /// Returns the number of blocks in the store.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

impl Blockstore for MemBlockstore {
    fn get(&self, ctx: &CallContext, k: &Cid) -> Result<Option<Vec<u8>>, ExternsError> {
        ctx.check()?;
        Ok(self.blocks.read().get(k).cloned())
    }

    fn put(&self, ctx: &CallContext, k: &Cid, block: &[u8]) -> Result<(), ExternsError> {
        ctx.check()?;
        self.blocks.write().insert(*k, block.to_vec());
        Ok(())
    }

    fn put_many(&self, ctx: &CallContext, blocks: Vec<BlockRecord>) -> Result<(), ExternsError> {
        ctx.check()?;
        let mut map = self.blocks.write();
        for record in blocks {
            map.insert(record.cid, record.data);
        }
        Ok(())
    }

    fn has(&self, ctx: &CallContext, k: &Cid) -> Result<bool, ExternsError> {
        ctx.check()?;
        Ok(self.blocks.read().contains_key(k))
    }

    fn view(
        &self,
        ctx: &CallContext,
        k: &Cid,
        f: &mut dyn FnMut(&[u8]) -> Result<(), ExternsError>,
    ) -> Result<(), ExternsError> {
        ctx.check()?;
        let map = self.blocks.read();
        match map.get(k) {
            Some(block) => f(block),
            None => Err(ExternsError::NotFound),
        }
    }
}
