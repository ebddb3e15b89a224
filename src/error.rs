use crate::domain::account::AccountId;
use crate::domain::schema::SchemaViolation;
use crate::domain::transfer::ErrorReason;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the ledger.
///
/// Every failing path leaves storage unchanged before the error reaches the caller.
/// Only [`LedgerError::Contention`] is worth retrying with the same input.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid record: {0}")]
    Invalid(#[from] SchemaViolation),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("duplicate key: account {0} already exists")]
    DuplicateKey(AccountId),
    #[error("account {0} not found")]
    NotFound(AccountId),
    #[error("insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("contention: could not lock account {account} within {waited:?}")]
    Contention {
        account: AccountId,
        waited: Duration,
    },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::InternalError(Box::new(err))
    }
}

impl LedgerError {
    pub fn internal(msg: impl Into<String>) -> Self {
        LedgerError::InternalError(Box::new(std::io::Error::other(msg.into())))
    }

    /// The journal-level classification of this error.
    pub fn reason(&self) -> ErrorReason {
        match self {
            LedgerError::Invalid(_) | LedgerError::InvalidRequest(_) => ErrorReason::Invalid,
            LedgerError::DuplicateKey(_) => ErrorReason::DuplicateKey,
            LedgerError::NotFound(_) => ErrorReason::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorReason::InsufficientFunds,
            LedgerError::Contention { .. } => ErrorReason::Contention,
            LedgerError::CsvError(_)
            | LedgerError::IoError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::InternalError(_) => ErrorReason::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Contention { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_contention_is_retryable() {
        let contention = LedgerError::Contention {
            account: AccountId::from("acc1"),
            waited: Duration::from_millis(10),
        };
        assert!(contention.is_retryable());
        assert_eq!(contention.reason(), ErrorReason::Contention);

        let funds = LedgerError::InsufficientFunds {
            account: AccountId::from("acc1"),
            balance: dec!(10),
            requested: dec!(50),
        };
        assert!(!funds.is_retryable());
        assert_eq!(funds.reason(), ErrorReason::InsufficientFunds);

        let dup = LedgerError::DuplicateKey(AccountId::from("acc1"));
        assert!(!dup.is_retryable());
        assert_eq!(dup.reason(), ErrorReason::DuplicateKey);
    }

    #[test]
    fn test_schema_violation_maps_to_invalid() {
        let err: LedgerError = SchemaViolation::MissingField("balance".to_string()).into();
        assert_eq!(err.reason(), ErrorReason::Invalid);
        assert_eq!(err.to_string(), "invalid record: missing required field `balance`");
    }
}
