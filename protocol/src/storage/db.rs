//! # SledStore: Persistent State Store
//!
//! Disk-backed `StateStore` built on sled's embedded key-value engine. All
//! ledger state lives in a single named tree:
//!
//! | Tree    | Key (UTF-8)   | Value                 |
//! |---------|---------------|-----------------------|
//! | `state` | `AccountIds`  | JSON registry         |
//! | `state` | `acct:<id>`   | JSON account record   |
//!
//! ## Atomicity
//!
//! `apply` writes a whole `WriteSet` as one sled `Batch` and flushes. Either
//! every record of an invocation lands on disk or none does. Single `put`
//! calls are not flushed individually; call [`SledStore::flush`] when
//! durability matters outside a batch.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::{StateStore, StoreResult, WriteSet};
use crate::config::STATE_TREE_NAME;

/// Persistent state store backed by sled.
///
/// sled handles are cheap to clone and safe to share across threads, so a
/// `SledStore` can be wrapped in an `Arc` without extra locking.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    state: Tree,
}

impl SledStore {
    /// Open or create a store at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary store that is removed when dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let state = db.open_tree(STATE_TREE_NAME)?;
        Ok(Self { db, state })
    }

    /// Flush buffered writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Number of keys in the state tree.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// `true` if the state tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl StateStore for SledStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.state.insert(key.as_bytes(), value)?;
        Ok(())
    }

    fn apply(&self, writes: WriteSet) -> StoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let count = writes.len();
        let mut batch = Batch::default();
        for (key, value) in writes.into_writes() {
            batch.insert(key.as_bytes(), value);
        }
        self.state.apply_batch(batch)?;
        self.db.flush()?;

        tracing::trace!(writes = count, "write set applied");
        Ok(())
    }
}
