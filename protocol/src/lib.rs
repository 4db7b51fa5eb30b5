// Copyright (c) 2026 Tally Contributors. MIT License.
// See LICENSE for details.

//! # Tally Protocol: Core Library
//!
//! The plumbing underneath the Tally account ledger. The contract logic in
//! `tally-contracts` validates a request, reads a couple of records, and
//! writes them back. Everything it leans on lives here.
//!
//! ## Architecture
//!
//! - **config**: Key layout, initial balances, default ports.
//! - **storage**: The `StateStore` abstraction the contract runs against,
//!   plus an in-memory backend, a sled backend, and a per-invocation staging
//!   overlay that gives hosts an all-or-nothing write boundary.
//! - **auth**: Pluggable authorization for mutating operations.
//!
//! ## Stateless contract, stateful host
//!
//! The contract never keeps account state between calls. Every operation
//! reads what it needs from the store immediately before computing its new
//! state, so whatever concurrency control the host applies sees a fresh
//! read/write set per invocation. Don't add a cache in front of the store.

pub mod auth;
pub mod config;
pub mod storage;

pub use auth::{AuthError, AuthPolicy, CallerTokenPolicy, Credentials, SharedSecretPolicy};
pub use storage::{
    MemoryStore, SledStore, StagedStore, StateStore, StoreError, StoreResult,
    WriteSet,
};
