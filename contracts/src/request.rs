//! # Ledger Requests
//!
//! The contract surface is a fixed set of named operations. Hosts that speak
//! the chaincode convention pass a function name and positional string
//! arguments; everything else can build a [`LedgerRequest`] directly.
//!
//! | Operation           | Positional args                 | Kind   |
//! |---------------------|---------------------------------|--------|
//! | `init`              | (ignored)                       | invoke |
//! | `registerAccounts`  | `[jsonArrayOfIds]`              | invoke |
//! | `transfer`          | `[from, to, amount, token]`     | invoke |
//! | `addLoyalty`        | `[accountId, points, token]`    | invoke |
//! | `removeLoyalty`     | `[accountId, points, token]`    | invoke |
//! | `GetAllAccountIds`  | (ignored)                       | query  |
//! | `GetAccountDetails` | `[accountId]`                   | query  |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use tally_protocol::Credentials;

use crate::account_ledger::{LedgerError, LedgerResult};

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A named contract operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    RegisterAccounts,
    Transfer,
    AddLoyalty,
    RemoveLoyalty,
    GetAllAccountIds,
    GetAccountDetails,
}

impl Operation {
    /// Every operation, invocations first.
    pub const ALL: [Operation; 7] = [
        Operation::Init,
        Operation::RegisterAccounts,
        Operation::Transfer,
        Operation::AddLoyalty,
        Operation::RemoveLoyalty,
        Operation::GetAllAccountIds,
        Operation::GetAccountDetails,
    ];

    /// Wire name of the operation. Case-sensitive.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::RegisterAccounts => "registerAccounts",
            Operation::Transfer => "transfer",
            Operation::AddLoyalty => "addLoyalty",
            Operation::RemoveLoyalty => "removeLoyalty",
            Operation::GetAllAccountIds => "GetAllAccountIds",
            Operation::GetAccountDetails => "GetAccountDetails",
        }
    }

    /// Looks an operation up by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// `true` for read-only operations.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Operation::GetAllAccountIds | Operation::GetAccountDetails
        )
    }

    /// Position of the security token in the positional arguments.
    pub fn token_index(&self) -> Option<usize> {
        match self {
            Operation::Transfer => Some(3),
            Operation::AddLoyalty | Operation::RemoveLoyalty => Some(2),
            _ => None,
        }
    }

    /// Validates the number of positional arguments.
    pub fn check_args(&self, args: &[String]) -> LedgerResult<()> {
        let (ok, expected) = match self {
            Operation::Init | Operation::GetAllAccountIds => (true, ""),
            Operation::RegisterAccounts => (args.len() == 1, "Expecting account numbers"),
            Operation::Transfer => (
                args.len() == 4,
                "Expecting from, to, amount and token",
            ),
            Operation::AddLoyalty | Operation::RemoveLoyalty => (
                args.len() == 3,
                "Expecting account id, number of points and a token",
            ),
            Operation::GetAccountDetails => (!args.is_empty(), "Expecting account id"),
        };
        if ok {
            Ok(())
        } else {
            Err(LedgerError::InvalidInput(format!(
                "incorrect number of arguments for {}: got {}. {}",
                self.name(),
                args.len(),
                expected
            )))
        }
    }

    /// Extracts the credentials of a mutating operation from its positional
    /// arguments. Call [`check_args`](Self::check_args) first.
    pub fn credentials(&self, args: &[String], caller: Option<&str>) -> Option<Credentials> {
        let token = args.get(self.token_index()?)?;
        Some(Credentials {
            caller: caller.map(str::to_string),
            token: token.clone(),
        })
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| LedgerError::UnknownOperation(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// LedgerRequest
// ---------------------------------------------------------------------------

/// A fully typed contract request.
///
/// JSON form carries an `operation` tag with the wire name, e.g.
///
/// ```text
/// {"operation":"transfer","from":"alice","to":"bob","amount":"2500.0",
///  "credentials":{"token":"..."}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation")]
pub enum LedgerRequest {
    #[serde(rename = "init")]
    Init,

    #[serde(rename = "registerAccounts")]
    RegisterAccounts { ids: Vec<String> },

    #[serde(rename = "transfer")]
    Transfer {
        from: String,
        to: String,
        amount: Decimal,
        credentials: Credentials,
    },

    #[serde(rename = "addLoyalty")]
    AddLoyalty {
        account_id: String,
        points: i64,
        credentials: Credentials,
    },

    #[serde(rename = "removeLoyalty")]
    RemoveLoyalty {
        account_id: String,
        points: i64,
        credentials: Credentials,
    },

    #[serde(rename = "GetAllAccountIds")]
    GetAllAccountIds,

    #[serde(rename = "GetAccountDetails")]
    GetAccountDetails { account_id: String },
}

impl LedgerRequest {
    /// The operation this request performs.
    pub fn operation(&self) -> Operation {
        match self {
            LedgerRequest::Init => Operation::Init,
            LedgerRequest::RegisterAccounts { .. } => Operation::RegisterAccounts,
            LedgerRequest::Transfer { .. } => Operation::Transfer,
            LedgerRequest::AddLoyalty { .. } => Operation::AddLoyalty,
            LedgerRequest::RemoveLoyalty { .. } => Operation::RemoveLoyalty,
            LedgerRequest::GetAllAccountIds => Operation::GetAllAccountIds,
            LedgerRequest::GetAccountDetails { .. } => Operation::GetAccountDetails,
        }
    }

    /// Credentials attached to the request, if the operation needs any.
    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            LedgerRequest::Transfer { credentials, .. }
            | LedgerRequest::AddLoyalty { credentials, .. }
            | LedgerRequest::RemoveLoyalty { credentials, .. } => Some(credentials),
            _ => None,
        }
    }

    /// Parses positional string arguments into a typed request.
    ///
    /// Only shapes and formats are checked here; registration and balances
    /// are the ledger's business.
    pub fn from_args(op: Operation, args: &[String], caller: Option<&str>) -> LedgerResult<Self> {
        op.check_args(args)?;
        let credentials = || {
            op.credentials(args, caller)
                .ok_or_else(|| LedgerError::InvalidInput("missing security token".into()))
        };

        let request = match op {
            Operation::Init => LedgerRequest::Init,
            Operation::RegisterAccounts => LedgerRequest::RegisterAccounts {
                ids: parse_ids(&args[0])?,
            },
            Operation::Transfer => LedgerRequest::Transfer {
                from: args[0].clone(),
                to: args[1].clone(),
                amount: parse_amount(&args[2])?,
                credentials: credentials()?,
            },
            Operation::AddLoyalty => LedgerRequest::AddLoyalty {
                account_id: args[0].clone(),
                points: parse_points(&args[1])?,
                credentials: credentials()?,
            },
            Operation::RemoveLoyalty => LedgerRequest::RemoveLoyalty {
                account_id: args[0].clone(),
                points: parse_points(&args[1])?,
                credentials: credentials()?,
            },
            Operation::GetAllAccountIds => LedgerRequest::GetAllAccountIds,
            Operation::GetAccountDetails => LedgerRequest::GetAccountDetails {
                account_id: args[0].clone(),
            },
        };
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Argument parsers
// ---------------------------------------------------------------------------

/// Parses a JSON array of account ids.
pub fn parse_ids(raw: &str) -> LedgerResult<Vec<String>> {
    serde_json::from_str(raw).map_err(|_| {
        LedgerError::InvalidInput("registerAccounts accepts an array of account ids".into())
    })
}

/// Parses a decimal amount. Plain (`2500.0`) and scientific (`2.5e3`)
/// notation are both accepted.
pub fn parse_amount(raw: &str) -> LedgerResult<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| LedgerError::InvalidInput(format!("amount is not a number: {:?}", raw)))
}

/// Parses a base-10 integer point count.
pub fn parse_points(raw: &str) -> LedgerResult<i64> {
    raw.parse::<i64>().map_err(|_| {
        LedgerError::InvalidInput(format!("number of loyalty points is not a number: {:?}", raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account_ledger::ErrorKind;
    use rust_decimal_macros::dec;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(op));
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
        // Names are case-sensitive.
        assert!(Operation::from_name("Transfer").is_none());
        assert!(Operation::from_name("getAllAccountIds").is_none());
    }

    #[test]
    fn unknown_name_carries_attempted_name() {
        match "mint".parse::<Operation>() {
            Err(LedgerError::UnknownOperation(name)) => assert_eq!(name, "mint"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn query_split() {
        let queries: Vec<_> = Operation::ALL.into_iter().filter(|o| o.is_query()).collect();
        assert_eq!(
            queries,
            vec![Operation::GetAllAccountIds, Operation::GetAccountDetails]
        );
    }

    #[test]
    fn arity_checked() {
        assert!(Operation::Init.check_args(&args(&["x", "y"])).is_ok());
        assert!(Operation::Transfer.check_args(&args(&["a", "b", "1"])).is_err());
        assert!(Operation::AddLoyalty.check_args(&args(&["a", "1", "t", "x"])).is_err());
        assert!(Operation::GetAccountDetails.check_args(&[]).is_err());
        assert!(Operation::RegisterAccounts.check_args(&[]).is_err());
    }

    #[test]
    fn transfer_from_args() {
        let req = LedgerRequest::from_args(
            Operation::Transfer,
            &args(&["alice", "bob", "2500.0", "tok"]),
            Some("teller"),
        )
        .unwrap();
        assert_eq!(
            req,
            LedgerRequest::Transfer {
                from: "alice".into(),
                to: "bob".into(),
                amount: dec!(2500.0),
                credentials: Credentials::for_caller("teller", "tok"),
            }
        );
        assert_eq!(req.operation(), Operation::Transfer);
        assert_eq!(req.credentials().unwrap().token, "tok");
    }

    #[test]
    fn loyalty_points_come_from_second_argument() {
        let req =
            LedgerRequest::from_args(Operation::AddLoyalty, &args(&["alice", "100", "tok"]), None)
                .unwrap();
        match req {
            LedgerRequest::AddLoyalty { points, .. } => assert_eq!(points, 100),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn malformed_fields_are_invalid_input() {
        let cases = [
            (Operation::RegisterAccounts, args(&["alice"])),
            (Operation::RegisterAccounts, args(&["[1,2]"])),
            (Operation::Transfer, args(&["a", "b", "lots", "t"])),
            (Operation::AddLoyalty, args(&["a", "1.5", "t"])),
            (Operation::RemoveLoyalty, args(&["a", "", "t"])),
        ];
        for (op, a) in cases {
            let err = LedgerRequest::from_args(op, &a, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{} {:?}", op, a);
        }
    }

    #[test]
    fn amount_formats() {
        assert_eq!(parse_amount("2500").unwrap(), dec!(2500));
        assert_eq!(parse_amount("-0.25").unwrap(), dec!(-0.25));
        assert_eq!(parse_amount("2.5e3").unwrap(), dec!(2500));
        assert!(parse_amount("NaN").is_err());
    }

    #[test]
    fn points_formats() {
        assert_eq!(parse_points("+5").unwrap(), 5);
        assert_eq!(parse_points("-5").unwrap(), -5);
        assert!(parse_points("5e1").is_err());
    }

    #[test]
    fn register_ids_parse() {
        assert_eq!(
            parse_ids(r#"["alice","bob"]"#).unwrap(),
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert!(parse_ids("[]").unwrap().is_empty());
    }

    #[test]
    fn typed_json_form() {
        let json = r#"{"operation":"transfer","from":"a","to":"b","amount":"12.50","credentials":{"token":"t"}}"#;
        let req: LedgerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.operation(), Operation::Transfer);

        let json = r#"{"operation":"GetAllAccountIds"}"#;
        let req: LedgerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req, LedgerRequest::GetAllAccountIds);

        let json = r#"{"operation":"GetAccountDetails","account_id":"alice"}"#;
        let req: LedgerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.operation(), Operation::GetAccountDetails);
    }
}
