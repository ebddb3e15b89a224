use crate::domain::account::{Account, AccountId};
use crate::domain::index::{RecordLocation, UniqueIndex};
use crate::domain::ports::{AccountStore, TransferStore};
use crate::domain::schema::Schema;
use crate::domain::transfer::{Transfer, TransferId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Collection {
    index: UniqueIndex,
    records: HashMap<RecordLocation, Account>,
    schema: Option<Schema>,
}

/// A thread-safe in-memory `accounts` collection.
///
/// Index and records live behind one `RwLock`, so an insert or a batch commit
/// is observed by readers either entirely or not at all.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    collection: Arc<RwLock<Collection>>,
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: Account) -> Result<RecordLocation> {
        let mut collection = self.collection.write().await;
        if collection.index.contains(&account.account_num) {
            return Err(LedgerError::DuplicateKey(account.account_num));
        }
        let location = collection.index.allocate();
        collection
            .index
            .insert(account.account_num.clone(), location)?;
        collection.records.insert(location, account);
        Ok(location)
    }

    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        let collection = self.collection.read().await;
        let Ok(location) = collection.index.lookup(id) else {
            return Ok(None);
        };
        Ok(collection.records.get(&location).cloned())
    }

    async fn commit(&self, accounts: Vec<Account>) -> Result<()> {
        let mut collection = self.collection.write().await;
        let mut located = Vec::with_capacity(accounts.len());
        for account in accounts {
            let location = collection.index.lookup(&account.account_num)?;
            located.push((location, account));
        }
        for (location, account) in located {
            collection.records.insert(location, account);
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        let collection = self.collection.read().await;
        let mut accounts: Vec<(RecordLocation, Account)> = collection
            .records
            .iter()
            .map(|(location, account)| (*location, account.clone()))
            .collect();
        accounts.sort_by_key(|(location, _)| *location);
        Ok(accounts.into_iter().map(|(_, account)| account).collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut collection = self.collection.write().await;
        collection.index = UniqueIndex::new();
        collection.records.clear();
        collection.schema = None;
        Ok(())
    }

    async fn install_schema(&self, schema: Schema) -> Result<()> {
        self.collection.write().await.schema = Some(schema);
        Ok(())
    }

    async fn schema(&self) -> Result<Option<Schema>> {
        Ok(self.collection.read().await.schema.clone())
    }
}

/// A thread-safe in-memory transfer journal.
#[derive(Default, Clone)]
pub struct InMemoryTransferStore {
    transfers: Arc<RwLock<BTreeMap<TransferId, Transfer>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryTransferStore {
    /// Creates a new, empty in-memory journal.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn next_id(&self) -> Result<TransferId> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn store(&self, transfer: Transfer) -> Result<()> {
        let mut transfers = self.transfers.write().await;
        transfers.insert(transfer.id, transfer);
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>> {
        let transfers = self.transfers.read().await;
        Ok(transfers.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Transfer>> {
        let transfers = self.transfers.read().await;
        Ok(transfers.values().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.transfers.write().await.clear();
        self.next_id.store(0, Ordering::SeqCst);
        Ok(())
    }
}
