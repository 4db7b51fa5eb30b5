//! In-memory state store for tests and local demos.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{StateStore, StoreResult, WriteSet};

/// In-memory state store backed by a `BTreeMap`.
///
/// Thread-safe; keys are kept sorted so dumps are deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Snapshot of every stored key, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn apply(&self, writes: WriteSet) -> StoreResult<()> {
        let mut data = self.data.write();
        for (key, value) in writes.into_writes() {
            data.insert(key, value);
        }
        Ok(())
    }
}
