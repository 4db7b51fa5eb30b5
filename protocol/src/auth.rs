//! # Authorization Policies
//!
//! Every mutating ledger operation carries [`Credentials`]; an [`AuthPolicy`]
//! decides whether they are good enough. The contract does not care which
//! policy is installed, only that a rejected credential stops the mutation
//! before any state is read.
//!
//! Two policies ship with the crate:
//!
//! - [`SharedSecretPolicy`]: one secret shared by every caller.
//! - [`CallerTokenPolicy`]: a token per named caller.
//!
//! Tokens are compared through their SHA-256 digests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a credential check can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The supplied token does not match.
    #[error("security token does not match")]
    TokenMismatch,

    /// The policy needs a caller identity and none was supplied.
    #[error("caller identity required")]
    MissingCaller,

    /// The caller is not known to the policy.
    #[error("unknown caller: {0}")]
    UnknownCaller(String),

    /// The policy itself was configured with an unusable secret.
    #[error("invalid policy configuration: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// What a caller presents alongside a mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Identity of the caller, if the host knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    /// Secret token presented by the caller.
    pub token: String,
}

impl Credentials {
    /// Credentials with a token and no caller identity.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            caller: None,
            token: token.into(),
        }
    }

    /// Credentials for a named caller.
    pub fn for_caller(caller: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            caller: Some(caller.into()),
            token: token.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy Trait
// ---------------------------------------------------------------------------

/// Decides whether a set of credentials may mutate the ledger.
pub trait AuthPolicy: Send + Sync {
    /// Return `Ok(())` if `credentials` are accepted.
    fn authorize(&self, credentials: &Credentials) -> Result<(), AuthError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

fn digest(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ---------------------------------------------------------------------------
// SharedSecretPolicy
// ---------------------------------------------------------------------------

/// Accepts any caller presenting the one configured secret.
pub struct SharedSecretPolicy {
    secret_digest: [u8; 32],
}

impl SharedSecretPolicy {
    /// Build a policy around `secret`. An empty secret is rejected, since it
    /// would accept an omitted token.
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidConfig("shared secret is empty".into()));
        }
        Ok(Self {
            secret_digest: digest(secret),
        })
    }
}

impl std::fmt::Debug for SharedSecretPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretPolicy").finish_non_exhaustive()
    }
}

impl AuthPolicy for SharedSecretPolicy {
    fn authorize(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if digests_match(&self.secret_digest, &digest(&credentials.token)) {
            Ok(())
        } else {
            Err(AuthError::TokenMismatch)
        }
    }

    fn name(&self) -> &'static str {
        "shared-secret"
    }
}

// ---------------------------------------------------------------------------
// CallerTokenPolicy
// ---------------------------------------------------------------------------

/// Accepts a caller only if it is named and presents its own token.
pub struct CallerTokenPolicy {
    callers: HashMap<String, [u8; 32]>,
}

impl CallerTokenPolicy {
    /// Build a policy from a `caller -> token` table.
    pub fn new<I, K, V>(callers: I) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut table = HashMap::new();
        for (caller, token) in callers {
            let caller = caller.into();
            if token.as_ref().is_empty() {
                return Err(AuthError::InvalidConfig(format!(
                    "empty token for caller {}",
                    caller
                )));
            }
            table.insert(caller, digest(token.as_ref()));
        }
        if table.is_empty() {
            return Err(AuthError::InvalidConfig("caller table is empty".into()));
        }
        Ok(Self { callers: table })
    }

    /// Parse a JSON object of the form `{"caller": "token", ...}`.
    pub fn from_json(json: &[u8]) -> Result<Self, AuthError> {
        let table: HashMap<String, String> = serde_json::from_slice(json)
            .map_err(|e| AuthError::InvalidConfig(format!("caller table: {}", e)))?;
        Self::new(table)
    }

    /// Number of callers known to the policy.
    pub fn caller_count(&self) -> usize {
        self.callers.len()
    }
}

impl std::fmt::Debug for CallerTokenPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerTokenPolicy")
            .field("callers", &self.callers.len())
            .finish()
    }
}

impl AuthPolicy for CallerTokenPolicy {
    fn authorize(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let caller = credentials
            .caller
            .as_deref()
            .ok_or(AuthError::MissingCaller)?;
        let expected = self
            .callers
            .get(caller)
            .ok_or_else(|| AuthError::UnknownCaller(caller.to_string()))?;

        if digests_match(expected, &digest(&credentials.token)) {
            Ok(())
        } else {
            Err(AuthError::TokenMismatch)
        }
    }

    fn name(&self) -> &'static str {
        "caller-token"
    }
}
