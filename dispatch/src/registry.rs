//! Handle registry.
//!
//! Maps opaque integer handles to `(Externs, CallContext)` bindings. The
//! native engine only ever holds the integer; every boundary call resolves
//! it here.
//!
//! Handles are issued from a counter that only moves forward, so a stale
//! handle can never alias a later registration. Lookups take the read lock
//! and never block each other; register/unregister take the write lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use extbridge_hostapi::{CallContext, Externs};

/// A registered capability set and the context its calls run under.
#[derive(Clone)]
pub struct Binding {
    pub externs: Arc<dyn Externs>,
    pub context: CallContext,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Table {
    next_id: u64,
    entries: HashMap<u64, Binding>,
}

/// Concurrency-safe handle table.
#[derive(Default)]
pub struct Registry {
    table: RwLock<Table>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding and return its handle. Never fails.
    pub fn register(&self, context: CallContext, externs: Arc<dyn Externs>) -> u64 {
        let mut table = self.table.write();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(id, Binding { externs, context });
        log::debug!("registered externs handle {}", id);
        id
    }

    /// Remove a binding.
    ///
    /// Callers must unregister each handle at most once. Unknown or
    /// already-removed handles are a no-op and return `false`.
    pub fn unregister(&self, handle: u64) -> bool {
        let removed = self.table.write().entries.remove(&handle).is_some();
        if removed {
            log::debug!("unregistered externs handle {}", handle);
        } else {
            log::warn!("unregister of unknown externs handle {}", handle);
        }
        removed
    }

    /// Resolve a handle. `None` if it is unknown or unregistered.
    pub fn lookup(&self, handle: u64) -> Option<Binding> {
        self.table.read().entries.get(&handle).cloned()
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.read();
        f.debug_struct("Registry")
            .field("next_id", &table.next_id)
            .field("live", &table.entries.len())
            .finish()
    }
}
