use super::account::{Account, AccountId};
use super::index::RecordLocation;
use super::schema::Schema;
use super::transfer::{Transfer, TransferId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Storage of the `accounts` collection.
///
/// Implementations keep the unique index and the records consistent: `insert`
/// and `commit` either apply entirely or leave storage untouched.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Consults and updates the unique index, then writes the record, atomically.
    /// Fails with `DuplicateKey` if the identifier is taken.
    async fn insert(&self, account: Account) -> Result<RecordLocation>;
    async fn get(&self, id: &AccountId) -> Result<Option<Account>>;
    /// Overwrites existing records as one batch. Fails with `NotFound`, writing
    /// nothing, if any of them does not exist.
    async fn commit(&self, accounts: Vec<Account>) -> Result<()>;
    async fn get_all(&self) -> Result<Vec<Account>>;
    /// Drops every record and resets the index.
    async fn clear(&self) -> Result<()>;
    async fn install_schema(&self, schema: Schema) -> Result<()>;
    async fn schema(&self) -> Result<Option<Schema>>;
}

/// Journal of transfer attempts.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Reserves a fresh, monotonically increasing id.
    async fn next_id(&self) -> Result<TransferId>;
    async fn store(&self, transfer: Transfer) -> Result<()>;
    async fn get(&self, id: TransferId) -> Result<Option<Transfer>>;
    async fn get_all(&self) -> Result<Vec<Transfer>>;
    async fn clear(&self) -> Result<()>;
}

pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type TransferStoreRef = Arc<dyn TransferStore>;
