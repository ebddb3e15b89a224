use crate::domain::account::{ACCOUNT_NUM, AccountId, BALANCE};
use crate::domain::schema::{Document, FieldValue};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Deposit,
    Withdraw,
    Transfer,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Create => "create",
            OperationType::Deposit => "deposit",
            OperationType::Withdraw => "withdraw",
            OperationType::Transfer => "transfer",
        };
        f.write_str(name)
    }
}

/// One row of an operations file. Which fields are needed depends on the type.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Operation {
    pub r#type: OperationType,
    pub account: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Option<Decimal>,
}

impl Operation {
    /// The record a `create` row describes. Absent fields stay absent so the
    /// schema can report them.
    pub fn document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = &self.account {
            doc.insert(ACCOUNT_NUM, FieldValue::Text(id.to_string()));
        }
        if let Some(amount) = self.amount {
            doc.insert(BALANCE, FieldValue::Number(amount));
        }
        doc
    }

    pub fn account(&self) -> Result<&AccountId> {
        self.account.as_ref().ok_or_else(|| self.missing("account"))
    }

    pub fn to(&self) -> Result<&AccountId> {
        self.to.as_ref().ok_or_else(|| self.missing("to"))
    }

    pub fn amount(&self) -> Result<Decimal> {
        self.amount.ok_or_else(|| self.missing("amount"))
    }

    fn missing(&self, field: &str) -> LedgerError {
        LedgerError::InvalidRequest(format!("{} requires `{field}`", self.r#type))
    }
}
