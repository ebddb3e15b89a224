use crate::domain::schema::{Document, FieldValue, SchemaViolation};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field name of the account identifier in stored records.
pub const ACCOUNT_NUM: &str = "accountNum";
/// Field name of the balance in stored records.
pub const BALANCE: &str = "balance";

/// Globally unique account identifier.
///
/// Ordering is lexicographic and is the total order used for lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A monetary balance.
///
/// Wraps `rust_decimal::Decimal`; the type itself admits negative values so a
/// candidate record can be built and then rejected by the validator.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub Decimal);

/// A strictly positive amount moved by a transfer, deposit or withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::InvalidRequest(format!(
                "amount must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Balance {
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `None` when the sum leaves the range `Decimal` can represent.
    pub fn checked_add(self, delta: Decimal) -> Option<Self> {
        self.0.checked_add(delta).map(Self)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// A record of the `accounts` collection.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_num: AccountId,
    pub balance: Balance,
}

impl Account {
    pub fn new(account_num: impl Into<AccountId>, balance: Decimal) -> Self {
        Self {
            account_num: account_num.into(),
            balance: Balance::new(balance),
        }
    }

    /// Returns the candidate record after applying a signed delta. Not validated
    /// against the schema, but a sum outside the decimal range is `OutOfRange`.
    pub fn with_delta(&self, delta: Decimal) -> std::result::Result<Self, SchemaViolation> {
        let balance =
            self.balance
                .checked_add(delta)
                .ok_or_else(|| SchemaViolation::OutOfRange {
                    field: BALANCE.to_string(),
                    value: self.balance.0,
                    constraint: format!("adding {delta} overflows the balance"),
                })?;
        Ok(Self {
            account_num: self.account_num.clone(),
            balance,
        })
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(ACCOUNT_NUM, FieldValue::Text(self.account_num.to_string()));
        doc.insert(BALANCE, FieldValue::Number(self.balance.0));
        doc
    }

    /// Builds an account from a document that has already passed the schema.
    ///
    /// A custom schema may not require the account fields, so they are checked here too.
    pub fn from_document(doc: &Document) -> std::result::Result<Self, SchemaViolation> {
        let account_num = match doc.get(ACCOUNT_NUM) {
            Some(FieldValue::Text(id)) if !id.is_empty() => AccountId::new(id.clone()),
            Some(FieldValue::Text(_)) | None => {
                return Err(SchemaViolation::MissingField(ACCOUNT_NUM.to_string()));
            }
            Some(FieldValue::Number(_)) => {
                return Err(SchemaViolation::TypeMismatch {
                    field: ACCOUNT_NUM.to_string(),
                    expected: "string",
                });
            }
        };
        let balance = match doc.get(BALANCE) {
            Some(FieldValue::Number(value)) => Balance::new(*value),
            Some(FieldValue::Text(_)) => {
                return Err(SchemaViolation::TypeMismatch {
                    field: BALANCE.to_string(),
                    expected: "double",
                });
            }
            None => return Err(SchemaViolation::MissingField(BALANCE.to_string())),
        };
        Ok(Self {
            account_num,
            balance,
        })
    }
}
