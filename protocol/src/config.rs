//! # Ledger Configuration & Constants
//!
//! Every fixed value the ledger depends on lives here: the key layout in the
//! state store, the opening balance of a freshly registered account, and the
//! default ports of the host node.
//!
//! The key layout is part of the persisted format. Renaming a key after data
//! has been written orphans every record stored under the old name.

// ---------------------------------------------------------------------------
// Key Layout
// ---------------------------------------------------------------------------

/// Store key holding the JSON-encoded account registry (`id -> 1`).
pub const ACCOUNT_IDS_KEY: &str = "AccountIds";

/// Prefix for per-account records. The full key is `acct:<id>`.
pub const ACCOUNT_PREFIX: &str = "acct:";

/// Registry flag value marking an id as registered.
pub const REGISTERED_FLAG: i64 = 1;

/// Builds the store key for an account record.
pub fn account_key(id: &str) -> String {
    format!("{}{}", ACCOUNT_PREFIX, id)
}

// ---------------------------------------------------------------------------
// Account Defaults
// ---------------------------------------------------------------------------

/// Opening monetary balance of every new account, in whole currency units.
pub const INITIAL_BALANCE: i64 = 10_000;

/// Opening loyalty balance of every new account.
pub const INITIAL_LOYALTY: i64 = 0;

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Version of the contract surface (operation names and argument shapes).
pub const CONTRACT_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_API_PORT: u16 = 7051;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 7052;

/// Name of the sled tree that holds ledger state.
pub const STATE_TREE_NAME: &str = "state";
