//! # Dispatch
//!
//! Single entry point from a named operation to the ledger. Hosts call
//! [`AccountLedger::invoke`] for mutating operations and
//! [`AccountLedger::query`] for read-only ones, mirroring the chaincode split
//! between transactions and queries; [`AccountLedger::handle`] accepts both.
//!
//! Positional arguments are checked in this order: operation name, argument
//! count, credentials, then field formats. A wrong token therefore fails with
//! `AuthError` even when the other arguments are malformed.

use serde::Serialize;

use tally_protocol::{StateStore, StoreError};

use crate::account_ledger::{Account, AccountLedger, AccountRegistry, LedgerError, LedgerResult};
use crate::request::{LedgerRequest, Operation};

/// Result of a successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// Mutations return nothing.
    Empty,
    /// `GetAllAccountIds`.
    Registry(AccountRegistry),
    /// `GetAccountDetails`.
    Account(Account),
}

impl Response {
    /// JSON payload handed back to the caller; `None` for [`Response::Empty`].
    pub fn to_bytes(&self) -> LedgerResult<Option<Vec<u8>>> {
        let bytes = match self {
            Response::Empty => return Ok(None),
            Response::Registry(registry) => serde_json::to_vec(registry),
            Response::Account(account) => serde_json::to_vec(account),
        };
        bytes
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()).into())
    }
}

impl AccountLedger {
    /// Runs a mutating operation by name.
    ///
    /// Query names are rejected with `UnknownOperation`.
    pub fn invoke<S: StateStore + ?Sized>(
        &self,
        store: &S,
        function: &str,
        args: &[String],
        caller: Option<&str>,
    ) -> LedgerResult<Response> {
        tracing::debug!(function, "invoke is running");
        match Operation::from_name(function) {
            Some(op) if !op.is_query() => self.run(store, op, args, caller),
            _ => Err(unknown(function)),
        }
    }

    /// Runs a read-only operation by name.
    ///
    /// Mutating names are rejected with `UnknownOperation`.
    pub fn query<S: StateStore + ?Sized>(
        &self,
        store: &S,
        function: &str,
        args: &[String],
    ) -> LedgerResult<Response> {
        tracing::debug!(function, "query is running");
        match Operation::from_name(function) {
            Some(op) if op.is_query() => self.run(store, op, args, None),
            _ => Err(unknown(function)),
        }
    }

    /// Runs any operation by name.
    pub fn handle<S: StateStore + ?Sized>(
        &self,
        store: &S,
        function: &str,
        args: &[String],
        caller: Option<&str>,
    ) -> LedgerResult<Response> {
        let op = Operation::from_name(function).ok_or_else(|| unknown(function))?;
        self.run(store, op, args, caller)
    }

    /// Runs a typed request, checking its credentials first.
    pub fn execute<S: StateStore + ?Sized>(
        &self,
        store: &S,
        request: LedgerRequest,
    ) -> LedgerResult<Response> {
        if let Some(credentials) = request.credentials() {
            self.authorize(credentials)?;
        }
        self.execute_authorized(store, request)
    }

    fn run<S: StateStore + ?Sized>(
        &self,
        store: &S,
        op: Operation,
        args: &[String],
        caller: Option<&str>,
    ) -> LedgerResult<Response> {
        op.check_args(args)?;
        if let Some(credentials) = op.credentials(args, caller) {
            self.authorize(&credentials)?;
        }
        let request = LedgerRequest::from_args(op, args, caller)?;
        self.execute_authorized(store, request)
    }

    fn execute_authorized<S: StateStore + ?Sized>(
        &self,
        store: &S,
        request: LedgerRequest,
    ) -> LedgerResult<Response> {
        match request {
            LedgerRequest::Init => {
                self.initialize(store)?;
                Ok(Response::Empty)
            }
            LedgerRequest::RegisterAccounts { ids } => {
                self.register_accounts(store, &ids)?;
                Ok(Response::Empty)
            }
            LedgerRequest::Transfer {
                from, to, amount, ..
            } => {
                self.apply_transfer(store, &from, &to, amount)?;
                Ok(Response::Empty)
            }
            LedgerRequest::AddLoyalty {
                account_id, points, ..
            } => {
                self.apply_add_loyalty(store, &account_id, points)?;
                Ok(Response::Empty)
            }
            LedgerRequest::RemoveLoyalty {
                account_id, points, ..
            } => {
                self.apply_remove_loyalty(store, &account_id, points)?;
                Ok(Response::Empty)
            }
            LedgerRequest::GetAllAccountIds => {
                Ok(Response::Registry(self.get_all_account_ids(store)?))
            }
            LedgerRequest::GetAccountDetails { account_id } => {
                Ok(Response::Account(self.get_account_details(store, &account_id)?))
            }
        }
    }
}

fn unknown(function: &str) -> LedgerError {
    tracing::warn!(function, "did not find function");
    LedgerError::UnknownOperation(function.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account_ledger::ErrorKind;
    use tally_protocol::{MemoryStore, SharedSecretPolicy};

    fn ledger() -> AccountLedger {
        AccountLedger::new(SharedSecretPolicy::new("tok").unwrap())
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn invoke_rejects_query_names() {
        let store = MemoryStore::new();
        let err = ledger()
            .invoke(&store, "GetAllAccountIds", &[], None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOperation);
    }

    #[test]
    fn query_rejects_mutating_names() {
        let store = MemoryStore::new();
        let err = ledger().query(&store, "init", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOperation);
        assert!(store.is_empty());
    }

    #[test]
    fn handle_accepts_both_kinds() {
        let store = MemoryStore::new();
        let l = ledger();
        assert_eq!(l.handle(&store, "init", &[], None).unwrap(), Response::Empty);
        assert_eq!(
            l.handle(&store, "GetAllAccountIds", &[], None).unwrap(),
            Response::Registry(AccountRegistry::new())
        );
    }

    #[test]
    fn wrong_token_beats_malformed_amount() {
        let store = MemoryStore::new();
        let err = ledger()
            .invoke(&store, "transfer", &args(&["a", "b", "lots", "bad"]), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthError);
    }

    #[test]
    fn arity_checked_before_token() {
        let store = MemoryStore::new();
        let err = ledger()
            .invoke(&store, "transfer", &args(&["a", "b", "bad"]), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn typed_request_checks_credentials() {
        let store = MemoryStore::new();
        let request: LedgerRequest = serde_json::from_str(
            r#"{"operation":"addLoyalty","account_id":"a","points":1,"credentials":{"token":"nope"}}"#,
        )
        .unwrap();
        let err = ledger().execute(&store, request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthError);
    }

    #[test]
    fn response_bytes() {
        assert_eq!(Response::Empty.to_bytes().unwrap(), None);
        let bytes = Response::Registry(AccountRegistry::new())
            .to_bytes()
            .unwrap()
            .unwrap();
        assert_eq!(bytes, b"{}".to_vec());
    }
}
