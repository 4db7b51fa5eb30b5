//! # Account Ledger Contract
//!
//! Registers accounts, transfers money between them, and adjusts their
//! loyalty points. State lives entirely in the injected [`StateStore`]:
//!
//! | Key          | Value                                        |
//! |--------------|----------------------------------------------|
//! | `AccountIds` | `{"alice":1,"bob":1}`, the account registry |
//! | `acct:<id>`  | `{"id":"alice","balance":10000.0,"loyalty":0}` |
//!
//! ## Security Model
//!
//! - **Credential gating**: every mutating operation other than `init` and
//!   `registerAccounts` runs its [`Credentials`] through the installed
//!   [`AuthPolicy`] before reading any state.
//! - **Registry gating**: transfers and loyalty changes only touch ids present
//!   in the registry.
//! - **No negative balances**: a transfer larger than the sender's balance and
//!   a deduction larger than the loyalty balance are both rejected.
//!
//! ## Partial writes
//!
//! `register_accounts` writes the registry first and then each new account
//! record in turn. If the store fails halfway, earlier writes stay. Hosts that
//! need all-or-nothing behaviour run the invocation against a
//! [`tally_protocol::StagedStore`] and commit only on success.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use tally_protocol::config::{
    account_key, ACCOUNT_IDS_KEY, INITIAL_BALANCE, INITIAL_LOYALTY, REGISTERED_FLAG,
};
use tally_protocol::{AuthError, AuthPolicy, Credentials, StateStore, StoreError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Arguments could not be parsed or violate a basic constraint.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Credentials were rejected by the authorization policy.
    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),

    /// The account id is not in the registry.
    #[error("account is not registered: {0}")]
    UnregisteredAccount(String),

    /// The sender cannot cover the transfer.
    #[error("insufficient funds in {id}: balance {balance}, requested {amount}")]
    InsufficientFunds {
        /// Sending account.
        id: String,
        /// Balance at the time of the request.
        balance: Decimal,
        /// Amount requested.
        amount: Decimal,
    },

    /// The account does not hold enough loyalty points for the deduction.
    #[error("insufficient loyalty points in {id}: has {loyalty}, requested {points}")]
    InsufficientLoyalty {
        /// Account being debited.
        id: String,
        /// Loyalty balance at the time of the request.
        loyalty: i64,
        /// Points requested.
        points: i64,
    },

    /// No value is stored under the key.
    #[error("no record stored under {0}")]
    NotFound(String),

    /// A stored value could not be decoded.
    #[error("corrupt record under {key}: {reason}")]
    Corrupt {
        /// Store key of the offending record.
        key: String,
        /// Decoder message.
        reason: String,
    },

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The operation name is not part of the contract surface.
    #[error("received unknown function invocation: {0}")]
    UnknownOperation(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Stable error category, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    AuthError,
    UnregisteredAccount,
    InsufficientFunds,
    InsufficientLoyalty,
    NotFound,
    StorageError,
    UnknownOperation,
}

impl ErrorKind {
    /// Name used in API bodies and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::AuthError => "AuthError",
            ErrorKind::UnregisteredAccount => "UnregisteredAccount",
            ErrorKind::InsufficientFunds => "InsufficientFunds",
            ErrorKind::InsufficientLoyalty => "InsufficientLoyalty",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::StorageError => "StorageError",
            ErrorKind::UnknownOperation => "UnknownOperation",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidInput(_) => ErrorKind::InvalidInput,
            LedgerError::Auth(_) => ErrorKind::AuthError,
            LedgerError::UnregisteredAccount(_) => ErrorKind::UnregisteredAccount,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::InsufficientLoyalty { .. } => ErrorKind::InsufficientLoyalty,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::Corrupt { .. } | LedgerError::Storage(_) => ErrorKind::StorageError,
            LedgerError::UnknownOperation(_) => ErrorKind::UnknownOperation,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account id, identical to its registry key.
    pub id: String,
    /// Monetary balance. Serialized as a JSON number carrying every digit.
    #[serde(with = "exact_number")]
    pub balance: Decimal,
    /// Loyalty-point balance.
    pub loyalty: i64,
}

impl Account {
    /// A freshly registered account with the opening balances.
    pub fn opening(id: impl Into<String>) -> Self {
        // One decimal place, so a fresh record reads `10000.0`.
        let mut balance = Decimal::from(INITIAL_BALANCE);
        balance.rescale(1);
        Self {
            id: id.into(),
            balance,
            loyalty: INITIAL_LOYALTY,
        }
    }
}

/// Exact JSON-number encoding for balances.
///
/// The decimal's own digits are written as a raw JSON number and parsed back
/// with base-10 arithmetic, so no value passes through `f64`.
mod exact_number {
    use rust_decimal::Decimal;
    use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::value::RawValue;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = RawValue::from_string(value.to_string()).map_err(ser::Error::custom)?;
        raw.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let text = raw.get().trim_matches('"');
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map_err(de::Error::custom)
    }
}

/// The set of registered account ids, stored as `id -> 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountRegistry {
    ids: BTreeMap<String, i64>,
}

impl AccountRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `id` carries the registered flag.
    pub fn is_registered(&self, id: &str) -> bool {
        self.ids.get(id) == Some(&REGISTERED_FLAG)
    }

    /// Mark `id` registered. Returns `true` if it was not registered before.
    pub fn register(&mut self, id: &str) -> bool {
        let newly = !self.is_registered(id);
        self.ids.insert(id.to_string(), REGISTERED_FLAG);
        newly
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids
            .iter()
            .filter(|(_, flag)| **flag == REGISTERED_FLAG)
            .map(|(id, _)| id.as_str())
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.ids().count()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Behavioural switches for the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOptions {
    /// Reject negative transfer amounts and negative loyalty deltas with
    /// `InvalidInput`. Off by default: a negative amount then moves money from
    /// `to` to `from`, and negative points invert the loyalty operation.
    pub reject_negative_amounts: bool,
}

// ---------------------------------------------------------------------------
// AccountLedger
// ---------------------------------------------------------------------------

/// The account ledger contract.
///
/// Holds only its authorization policy and options. All account state is read
/// from and written to the store passed into each call.
#[derive(Clone)]
pub struct AccountLedger {
    policy: Arc<dyn AuthPolicy>,
    options: LedgerOptions,
}

impl std::fmt::Debug for AccountLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountLedger")
            .field("policy", &self.policy.name())
            .field("options", &self.options)
            .finish()
    }
}

impl AccountLedger {
    /// Creates a ledger guarded by `policy` with default options.
    pub fn new(policy: impl AuthPolicy + 'static) -> Self {
        Self::with_policy(Arc::new(policy))
    }

    /// Creates a ledger around a shared policy.
    pub fn with_policy(policy: Arc<dyn AuthPolicy>) -> Self {
        Self {
            policy,
            options: LedgerOptions::default(),
        }
    }

    /// Replaces the ledger options.
    pub fn with_options(mut self, options: LedgerOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> LedgerOptions {
        self.options
    }

    /// Runs `credentials` through the installed policy.
    pub fn authorize(&self, credentials: &Credentials) -> LedgerResult<()> {
        self.policy.authorize(credentials).map_err(|e| {
            tracing::warn!(
                policy = self.policy.name(),
                caller = credentials.caller.as_deref().unwrap_or("-"),
                "credentials rejected: {}",
                e
            );
            LedgerError::Auth(e)
        })
    }

    /// Writes an empty registry, replacing whatever was there.
    ///
    /// Account records are left in place but become unreachable through
    /// transfers and loyalty operations. Registering one of their ids again
    /// opens a fresh account over the old record.
    pub fn initialize<S: StateStore + ?Sized>(&self, store: &S) -> LedgerResult<()> {
        tracing::info!("initializing account registry");
        write_record(store, ACCOUNT_IDS_KEY, &AccountRegistry::new())?;
        Ok(())
    }

    /// Registers every id in `ids` that is not registered yet and opens an
    /// account for it. Returns the ids that were newly created, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Corrupt`] if the stored registry cannot be
    /// decoded, and [`LedgerError::Storage`] if a write fails. Writes made
    /// before the failing one are not undone.
    pub fn register_accounts<S: StateStore + ?Sized>(
        &self,
        store: &S,
        ids: &[String],
    ) -> LedgerResult<Vec<String>> {
        let mut registry = load_registry(store)?.unwrap_or_default();

        let mut created = Vec::new();
        for id in ids {
            if registry.register(id) {
                created.push(id.clone());
            }
        }

        write_record(store, ACCOUNT_IDS_KEY, &registry)?;

        for id in &created {
            write_record(store, &account_key(id), &Account::opening(id.as_str()))?;
            tracing::debug!(account = %id, "account opened");
        }

        tracing::info!(
            requested = ids.len(),
            created = created.len(),
            "accounts registered"
        );
        Ok(created)
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// Checks, in order: credentials, amount sign (only with
    /// `reject_negative_amounts`), registration of `from` then `to`, and the
    /// sender's balance. Writes `from` first, then `to`. A self-transfer
    /// leaves the balance unchanged.
    pub fn transfer<S: StateStore + ?Sized>(
        &self,
        store: &S,
        from: &str,
        to: &str,
        amount: Decimal,
        credentials: &Credentials,
    ) -> LedgerResult<()> {
        self.authorize(credentials)?;
        self.apply_transfer(store, from, to, amount)
    }

    /// Adds `points` to the loyalty balance of `id`.
    pub fn add_loyalty<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        points: i64,
        credentials: &Credentials,
    ) -> LedgerResult<()> {
        self.authorize(credentials)?;
        self.apply_add_loyalty(store, id, points)
    }

    /// Removes `points` from the loyalty balance of `id`, failing with
    /// [`LedgerError::InsufficientLoyalty`] if the balance is smaller.
    pub fn remove_loyalty<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        points: i64,
        credentials: &Credentials,
    ) -> LedgerResult<()> {
        self.authorize(credentials)?;
        self.apply_remove_loyalty(store, id, points)
    }

    /// Returns the full registry.
    ///
    /// Fails with [`LedgerError::NotFound`] if the ledger was never
    /// initialized.
    pub fn get_all_account_ids<S: StateStore + ?Sized>(
        &self,
        store: &S,
    ) -> LedgerResult<AccountRegistry> {
        load_registry(store)?.ok_or_else(|| LedgerError::NotFound(ACCOUNT_IDS_KEY.to_string()))
    }

    /// Returns the account record for `id`.
    ///
    /// Reads the record directly; an id whose record was never written fails
    /// with [`LedgerError::NotFound`] whether or not it is in the registry.
    pub fn get_account_details<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
    ) -> LedgerResult<Account> {
        read_account(store, id)
    }

    // -- Unchecked operation bodies -----------------------------------------
    //
    // Callers must have authorized the request already.

    pub(crate) fn apply_transfer<S: StateStore + ?Sized>(
        &self,
        store: &S,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> LedgerResult<()> {
        if self.options.reject_negative_amounts && amount < Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "transfer amount must not be negative: {}",
                amount
            )));
        }

        let registry = load_registry(store)?.unwrap_or_default();
        require_registered(&registry, from)?;
        require_registered(&registry, to)?;

        let mut from_account = read_account(store, from)?;
        if from_account.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                id: from.to_string(),
                balance: from_account.balance,
                amount,
            });
        }
        from_account.balance = from_account
            .balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InvalidInput("balance overflow".into()))?;

        // For a self-transfer the credit applies on top of the debit.
        let mut to_account = if from == to {
            from_account.clone()
        } else {
            read_account(store, to)?
        };
        to_account.balance = to_account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidInput("balance overflow".into()))?;

        write_record(store, &account_key(from), &from_account)?;
        write_record(store, &account_key(to), &to_account)?;

        tracing::info!(from = %from, to = %to, amount = %amount, "transfer applied");
        Ok(())
    }

    pub(crate) fn apply_add_loyalty<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        points: i64,
    ) -> LedgerResult<()> {
        self.check_points(points)?;
        let mut account = self.registered_account(store, id)?;

        account.loyalty = account
            .loyalty
            .checked_add(points)
            .ok_or_else(|| LedgerError::InvalidInput("loyalty balance overflow".into()))?;
        write_record(store, &account_key(id), &account)?;

        tracing::info!(account = %id, points, loyalty = account.loyalty, "loyalty added");
        Ok(())
    }

    pub(crate) fn apply_remove_loyalty<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        points: i64,
    ) -> LedgerResult<()> {
        self.check_points(points)?;
        let mut account = self.registered_account(store, id)?;

        if account.loyalty < points {
            return Err(LedgerError::InsufficientLoyalty {
                id: id.to_string(),
                loyalty: account.loyalty,
                points,
            });
        }
        account.loyalty = account
            .loyalty
            .checked_sub(points)
            .ok_or_else(|| LedgerError::InvalidInput("loyalty balance overflow".into()))?;
        write_record(store, &account_key(id), &account)?;

        tracing::info!(account = %id, points, loyalty = account.loyalty, "loyalty removed");
        Ok(())
    }

    fn check_points(&self, points: i64) -> LedgerResult<()> {
        if self.options.reject_negative_amounts && points < 0 {
            return Err(LedgerError::InvalidInput(format!(
                "loyalty points must not be negative: {}",
                points
            )));
        }
        Ok(())
    }

    fn registered_account<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
    ) -> LedgerResult<Account> {
        let registry = load_registry(store)?.unwrap_or_default();
        require_registered(&registry, id)?;
        read_account(store, id)
    }
}

// ---------------------------------------------------------------------------
// Store helpers
// ---------------------------------------------------------------------------

fn require_registered(registry: &AccountRegistry, id: &str) -> LedgerResult<()> {
    if registry.is_registered(id) {
        Ok(())
    } else {
        Err(LedgerError::UnregisteredAccount(id.to_string()))
    }
}

/// Reads the registry. `None` means the ledger was never initialized; a
/// stored JSON `null` decodes as an empty registry.
fn load_registry<S: StateStore + ?Sized>(store: &S) -> LedgerResult<Option<AccountRegistry>> {
    match store.get(ACCOUNT_IDS_KEY)? {
        Some(bytes) => {
            let registry: Option<AccountRegistry> =
                serde_json::from_slice(&bytes).map_err(|e| LedgerError::Corrupt {
                    key: ACCOUNT_IDS_KEY.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Some(registry.unwrap_or_default()))
        }
        None => Ok(None),
    }
}

fn read_account<S: StateStore + ?Sized>(store: &S, id: &str) -> LedgerResult<Account> {
    let key = account_key(id);
    let bytes = store
        .get(&key)?
        .ok_or_else(|| LedgerError::NotFound(key.clone()))?;
    serde_json::from_slice(&bytes).map_err(|e| LedgerError::Corrupt {
        key,
        reason: e.to_string(),
    })
}

fn write_record<S, T>(store: &S, key: &str, record: &T) -> LedgerResult<()>
where
    S: StateStore + ?Sized,
    T: Serialize,
{
    let bytes =
        serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.put(key, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_protocol::{MemoryStore, SharedSecretPolicy};

    const TOKEN: &str = "test-token";

    fn ledger() -> AccountLedger {
        AccountLedger::new(SharedSecretPolicy::new(TOKEN).unwrap())
    }

    fn creds() -> Credentials {
        Credentials::token(TOKEN)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn account_json_layout() {
        let json = serde_json::to_string(&Account::opening("alice")).unwrap();
        assert_eq!(json, r#"{"id":"alice","balance":10000.0,"loyalty":0}"#);

        let parsed: Account =
            serde_json::from_str(r#"{"id":"bob","balance":12500.5,"loyalty":7}"#).unwrap();
        assert_eq!(parsed.balance, dec!(12500.5));
        assert_eq!(parsed.loyalty, 7);
    }

    #[test]
    fn balance_digits_survive_storage() {
        let account = Account {
            id: "a".into(),
            balance: dec!(8765.4321098765433),
            loyalty: 0,
        };
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, r#"{"id":"a","balance":8765.4321098765433,"loyalty":0}"#);

        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back.balance, dec!(8765.4321098765433));

        let tiny: Account =
            serde_json::from_str(r#"{"id":"a","balance":9999.999999999999,"loyalty":0}"#).unwrap();
        assert_eq!(tiny.balance, dec!(9999.999999999999));
    }

    #[test]
    fn registry_json_layout() {
        let mut registry = AccountRegistry::new();
        assert!(registry.register("bob"));
        assert!(registry.register("alice"));
        assert!(!registry.register("alice"));
        assert_eq!(
            serde_json::to_string(&registry).unwrap(),
            r#"{"alice":1,"bob":1}"#
        );
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["alice", "bob"]);
    }

    #[test]
    fn registry_ignores_unflagged_entries() {
        let registry: AccountRegistry = serde_json::from_str(r#"{"a":1,"b":0}"#).unwrap();
        assert!(registry.is_registered("a"));
        assert!(!registry.is_registered("b"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn initialize_writes_empty_registry() {
        let store = MemoryStore::new();
        ledger().initialize(&store).unwrap();
        assert_eq!(store.get(ACCOUNT_IDS_KEY).unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn null_registry_reads_as_empty() {
        let store = MemoryStore::new();
        store.put(ACCOUNT_IDS_KEY, b"null").unwrap();
        let registry = ledger().get_all_account_ids(&store).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn corrupt_registry_is_storage_error() {
        let store = MemoryStore::new();
        store.put(ACCOUNT_IDS_KEY, b"not json").unwrap();
        let err = ledger()
            .register_accounts(&store, &ids(&["a"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageError);
    }

    #[test]
    fn register_without_initialize_creates_registry() {
        let store = MemoryStore::new();
        let created = ledger().register_accounts(&store, &ids(&["a"])).unwrap();
        assert_eq!(created, ids(&["a"]));
        assert!(ledger().get_all_account_ids(&store).unwrap().is_registered("a"));
    }

    #[test]
    fn duplicate_ids_in_one_batch_open_one_account() {
        let store = MemoryStore::new();
        let created = ledger()
            .register_accounts(&store, &ids(&["a", "b", "a"]))
            .unwrap();
        assert_eq!(created, ids(&["a", "b"]));
        // Registry plus two accounts.
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn self_transfer_keeps_balance() {
        let store = MemoryStore::new();
        let l = ledger();
        l.register_accounts(&store, &ids(&["a"])).unwrap();
        l.transfer(&store, "a", "a", dec!(400), &creds()).unwrap();
        assert_eq!(
            l.get_account_details(&store, "a").unwrap().balance,
            dec!(10000)
        );
    }

    #[test]
    fn self_transfer_still_needs_funds() {
        let store = MemoryStore::new();
        let l = ledger();
        l.register_accounts(&store, &ids(&["a"])).unwrap();
        let err = l
            .transfer(&store, "a", "a", dec!(10000.01), &creds())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn negative_amount_reverses_transfer_by_default() {
        let store = MemoryStore::new();
        let l = ledger();
        l.register_accounts(&store, &ids(&["a", "b"])).unwrap();
        l.transfer(&store, "a", "b", dec!(-100), &creds()).unwrap();
        assert_eq!(l.get_account_details(&store, "a").unwrap().balance, dec!(10100));
        assert_eq!(l.get_account_details(&store, "b").unwrap().balance, dec!(9900));
    }

    #[test]
    fn strict_options_reject_negative_values() {
        let store = MemoryStore::new();
        let l = ledger().with_options(LedgerOptions {
            reject_negative_amounts: true,
        });
        l.register_accounts(&store, &ids(&["a", "b"])).unwrap();

        let err = l.transfer(&store, "a", "b", dec!(-1), &creds()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = l.add_loyalty(&store, "a", -5, &creds()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = l.remove_loyalty(&store, "a", -5, &creds()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // Zero is not negative.
        l.transfer(&store, "a", "b", dec!(0), &creds()).unwrap();
    }

    #[test]
    fn loyalty_overflow_is_invalid_input() {
        let store = MemoryStore::new();
        let l = ledger();
        l.register_accounts(&store, &ids(&["a"])).unwrap();
        l.add_loyalty(&store, "a", i64::MAX, &creds()).unwrap();
        let err = l.add_loyalty(&store, "a", 1, &creds()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(l.get_account_details(&store, "a").unwrap().loyalty, i64::MAX);
    }

    #[test]
    fn registered_id_without_record_is_not_found() {
        let store = MemoryStore::new();
        let l = ledger();
        store.put(ACCOUNT_IDS_KEY, br#"{"ghost":1}"#).unwrap();
        let err = l.add_loyalty(&store, "ghost", 1, &creds()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn error_kind_names_are_stable() {
        assert_eq!(ErrorKind::AuthError.to_string(), "AuthError");
        assert_eq!(
            LedgerError::UnknownOperation("x".into()).kind().as_str(),
            "UnknownOperation"
        );
        assert_eq!(
            LedgerError::Storage(StoreError::Unavailable("down".into())).kind(),
            ErrorKind::StorageError
        );
    }
}
