//! # Tally Account Ledger Contract
//!
//! Business logic for a permissioned account ledger. Accounts hold a monetary
//! balance and a loyalty-point balance; the contract registers accounts,
//! moves money between them, and adjusts loyalty points.
//!
//! - **account_ledger**: records, errors, and the operations themselves.
//! - **request**: typed requests, and parsing of positional string arguments
//!   into them.
//! - **dispatch**: the single entry point routing a named operation to the
//!   ledger, split into mutating invocations and read-only queries.
//!
//! ## Design Principles
//!
//! 1. The contract is stateless. Every operation reads the store, computes,
//!    and writes back before returning. Hosts own ordering and atomicity.
//! 2. Money is `Decimal`, never `f64`, and every addition is checked.
//! 3. Credentials are checked before any field is parsed or any state is read.
//! 4. Records are JSON so any host can read them without this crate.

pub mod account_ledger;
pub mod dispatch;
pub mod request;

pub use account_ledger::{
    Account, AccountLedger, AccountRegistry, ErrorKind, LedgerError, LedgerOptions, LedgerResult,
};
pub use dispatch::Response;
pub use request::{LedgerRequest, Operation};
