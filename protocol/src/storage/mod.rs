//! # Storage Module
//!
//! The state store the account ledger runs against. In a blockchain host this
//! is the chaincode stub; outside one it is any of the backends below.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs     : StateStore trait, WriteSet, StoreError
//! memory.rs  : MemoryStore: BTreeMap behind a lock (tests, demos)
//! db.rs      : SledStore: persistent sled-backed store
//! staged.rs  : StagedStore: per-invocation write overlay
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! AccountLedger ──get/put──▶ StagedStore ──apply(WriteSet)──▶ SledStore
//!                               (one invocation)                (disk)
//! ```
//!
//! The contract only ever sees `get` and `put`. Whether those writes land
//! immediately or are staged and committed atomically is the host's choice.

pub mod db;
pub mod memory;
pub mod staged;

pub use db::SledStore;
pub use memory::MemoryStore;
pub use staged::StagedStore;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors raised by state store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Key/value state store provided by the host.
///
/// A missing key is `Ok(None)`, not an error; deciding whether absence is a
/// failure belongs to the caller.
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Apply every write in `writes` atomically.
    fn apply(&self, writes: WriteSet) -> StoreResult<()>;

    /// Check whether `key` holds a value.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn apply(&self, writes: WriteSet) -> StoreResult<()> {
        (**self).apply(writes)
    }
}

impl<S: StateStore + ?Sized> StateStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn apply(&self, writes: WriteSet) -> StoreResult<()> {
        (**self).apply(writes)
    }
}

// ---------------------------------------------------------------------------
// WriteSet
// ---------------------------------------------------------------------------

/// An ordered batch of writes to be applied atomically.
///
/// Later writes to the same key win, matching what sequential `put` calls
/// would have produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSet {
    writes: Vec<(String, Vec<u8>)>,
}

impl WriteSet {
    /// Create an empty write set.
    pub fn new() -> Self {
        Self { writes: Vec::new() }
    }

    /// Append a write.
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.writes.push((key.into(), value));
    }

    /// Number of writes in the set.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// `true` if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Keys touched by this write set, in write order (duplicates kept).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|(k, _)| k.as_str())
    }

    /// Consume the set, yielding `(key, value)` pairs in write order.
    pub fn into_writes(self) -> impl Iterator<Item = (String, Vec<u8>)> {
        self.writes.into_iter()
    }
}
