//! # StagedStore: Per-Invocation Write Overlay
//!
//! A host wraps its committed store in a `StagedStore` for the duration of a
//! single contract invocation. Reads fall through to the committed store
//! unless the invocation already wrote the key; writes are buffered. When the
//! invocation succeeds the host turns the overlay into a [`WriteSet`] and
//! applies it atomically; on failure it drops the overlay and nothing lands.
//!
//! The overlay must never outlive the invocation. Reusing one across calls
//! would turn it into a cache of account state, and the next invocation would
//! compute against values the host never ordered.

use parking_lot::Mutex;
use std::collections::HashMap;

use super::{StateStore, StoreResult, WriteSet};

/// Read-your-writes overlay on top of a committed store.
pub struct StagedStore<'a, S: StateStore + ?Sized> {
    inner: &'a S,
    staged: Mutex<Staged>,
}

#[derive(Default)]
struct Staged {
    /// Latest staged value per key.
    values: HashMap<String, Vec<u8>>,
    /// Every write in order, for the final write set.
    log: WriteSet,
}

impl<'a, S: StateStore + ?Sized> StagedStore<'a, S> {
    /// Start a new overlay over `inner`.
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            staged: Mutex::new(Staged::default()),
        }
    }

    /// Number of writes staged so far.
    pub fn pending(&self) -> usize {
        self.staged.lock().log.len()
    }

    /// Consume the overlay, returning its writes in order.
    pub fn into_write_set(self) -> WriteSet {
        self.staged.into_inner().log
    }

    /// Apply the staged writes to the underlying store atomically and return
    /// how many writes were committed.
    pub fn commit(self) -> StoreResult<usize> {
        let inner = self.inner;
        let writes = self.into_write_set();
        let count = writes.len();
        inner.apply(writes)?;
        Ok(count)
    }
}

impl<'a, S: StateStore + ?Sized> StateStore for StagedStore<'a, S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if let Some(value) = self.staged.lock().values.get(key) {
            return Ok(Some(value.clone()));
        }
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut staged = self.staged.lock();
        staged.values.insert(key.to_string(), value.to_vec());
        staged.log.put(key, value.to_vec());
        Ok(())
    }

    fn apply(&self, writes: WriteSet) -> StoreResult<()> {
        for (key, value) in writes.into_writes() {
            self.put(&key, &value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_reads_fall_through_to_inner() {
        let inner = MemoryStore::new();
        inner.put("acct:alice", b"committed").unwrap();

        let staged = StagedStore::new(&inner);
        assert_eq!(
            staged.get("acct:alice").unwrap(),
            Some(b"committed".to_vec())
        );
        assert!(staged.get("acct:bob").unwrap().is_none());
    }

    #[test]
    fn test_staged_writes_visible_but_not_committed() {
        let inner = MemoryStore::new();
        inner.put("k", b"old").unwrap();

        let staged = StagedStore::new(&inner);
        staged.put("k", b"new").unwrap();

        assert_eq!(staged.get("k").unwrap(), Some(b"new".to_vec()));
        assert_eq!(inner.get("k").unwrap(), Some(b"old".to_vec()));
        assert_eq!(staged.pending(), 1);
    }

    #[test]
    fn test_commit_applies_all_writes() {
        let inner = MemoryStore::new();
        let staged = StagedStore::new(&inner);
        staged.put("a", b"1").unwrap();
        staged.put("b", b"2").unwrap();
        staged.put("a", b"3").unwrap();

        assert_eq!(staged.commit().unwrap(), 3);
        assert_eq!(inner.get("a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(inner.get("b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_dropped_overlay_leaves_store_untouched() {
        let inner = MemoryStore::new();
        {
            let staged = StagedStore::new(&inner);
            staged.put("a", b"1").unwrap();
        }
        assert!(inner.is_empty());
    }
}
