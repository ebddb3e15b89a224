use crate::domain::account::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TransferId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Pending,
    Committed,
    Aborted,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Committed => "committed",
            TransferStatus::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Why a transfer was aborted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    Invalid,
    DuplicateKey,
    NotFound,
    InsufficientFunds,
    Contention,
    Internal,
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorReason::Invalid => "invalid",
            ErrorReason::DuplicateKey => "duplicate_key",
            ErrorReason::NotFound => "not_found",
            ErrorReason::InsufficientFunds => "insufficient_funds",
            ErrorReason::Contention => "contention",
            ErrorReason::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A signed balance change on one account.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub account_num: AccountId,
    pub amount: Decimal,
}

impl Entry {
    pub fn new(account_num: AccountId, amount: Decimal) -> Self {
        Self {
            account_num,
            amount,
        }
    }
}

/// Journal record of one atomic unit: its entries and how it ended.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: TransferId,
    pub entries: Vec<Entry>,
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<ErrorReason>,
}

impl Transfer {
    pub fn pending(id: TransferId, entries: Vec<Entry>) -> Self {
        Self {
            id,
            entries,
            status: TransferStatus::Pending,
            error_reason: None,
        }
    }

    /// Moves a pending transfer to `Committed`. Terminal states are left alone.
    pub fn commit(&mut self) {
        if self.status == TransferStatus::Pending {
            self.status = TransferStatus::Committed;
        }
    }

    /// Moves a pending transfer to `Aborted`. Terminal states are left alone.
    pub fn abort(&mut self, reason: ErrorReason) {
        if self.status == TransferStatus::Pending {
            self.status = TransferStatus::Aborted;
            self.error_reason = Some(reason);
        }
    }

    /// Sum of all entries; zero for a two-sided transfer.
    pub fn net_amount(&self) -> Decimal {
        self.entries.iter().map(|entry| entry.amount).sum()
    }
}
