use crate::domain::account::{Account, AccountId};
use crate::domain::index::{RecordLocation, UniqueIndex};
use crate::domain::ports::{AccountStore, TransferStore};
use crate::domain::schema::Schema;
use crate::domain::transfer::{Transfer, TransferId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Column Family for account records, keyed by record location.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for the unique index, keyed by account number.
pub const CF_ACCOUNT_INDEX: &str = "account_index";
/// Column Family for the transfer journal, keyed by transfer id.
pub const CF_TRANSFERS: &str = "transfers";
/// Column Family for collection metadata (the schema declaration).
pub const CF_META: &str = "meta";

const SCHEMA_KEY: &[u8] = b"schema";

/// A persistent store implementation using RocksDB.
///
/// Records, the unique index and the journal live in separate Column Families.
/// The index is loaded eagerly on open and kept in memory behind a lock that
/// also serializes every write, so each index update and its record write land
/// in the same `WriteBatch`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    index: Arc<RwLock<UniqueIndex>>,
    next_transfer_id: Arc<AtomicU64>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures the column families exist, then rebuilds the unique index and the
    /// transfer id counter from what is on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_ACCOUNT_INDEX, CF_TRANSFERS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), descriptors)?;
        let index = load_index(&db)?;
        let last_transfer_id = load_last_transfer_id(&db)?;
        info!(
            path = %path.as_ref().display(),
            accounts = index.len(),
            last_transfer_id,
            "opened rocksdb store"
        );

        Ok(Self {
            db: Arc::new(db),
            index: Arc::new(RwLock::new(index)),
            next_transfer_id: Arc::new(AtomicU64::new(last_transfer_id)),
        })
    }

    /// Deletes the database at `path`. Nothing must have it open.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        DB::destroy(&Options::default(), path.as_ref())?;
        Ok(())
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        cf_handle(&self.db, name)
    }

    /// Writes the index entry and the record in one batch.
    fn write_new_record(&self, account: &Account, location: RecordLocation) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_ACCOUNT_INDEX)?,
            account.account_num.as_str().as_bytes(),
            location.to_be_bytes(),
        );
        batch.put_cf(
            self.cf(CF_ACCOUNTS)?,
            location.to_be_bytes(),
            serde_json::to_vec(account)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    fn clear_cf(&self, batch: &mut WriteBatch, name: &str) -> Result<()> {
        let cf = self.cf(name)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            batch.delete_cf(cf, key);
        }
        Ok(())
    }
}

fn cf_handle<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| LedgerError::internal(format!("{name} column family not found")))
}

fn load_index(db: &DB) -> Result<UniqueIndex> {
    let cf = cf_handle(db, CF_ACCOUNT_INDEX)?;
    let mut entries = Vec::new();
    for item in db.iterator_cf(cf, IteratorMode::Start) {
        let (key, value) = item?;
        let id = String::from_utf8(key.to_vec())
            .map_err(|e| LedgerError::internal(format!("corrupt index key: {e}")))?;
        let location = RecordLocation::from_be_bytes(&value)
            .ok_or_else(|| LedgerError::internal(format!("corrupt index entry for {id}")))?;
        entries.push((AccountId::new(id), location));
    }
    UniqueIndex::build(entries)
}

fn load_last_transfer_id(db: &DB) -> Result<TransferId> {
    let cf = cf_handle(db, CF_TRANSFERS)?;
    match db.iterator_cf(cf, IteratorMode::End).next() {
        Some(item) => {
            let (key, _) = item?;
            let raw: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| LedgerError::internal("corrupt transfer key"))?;
            Ok(u64::from_be_bytes(raw))
        }
        None => Ok(0),
    }
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn insert(&self, account: Account) -> Result<RecordLocation> {
        let mut index = self.index.write().await;
        if index.contains(&account.account_num) {
            return Err(LedgerError::DuplicateKey(account.account_num));
        }
        let location = index.allocate();
        index.insert(account.account_num.clone(), location)?;

        if let Err(e) = self.write_new_record(&account, location) {
            index.remove(&account.account_num);
            return Err(e);
        }
        debug!(account = %account.account_num, location = location.0, "inserted account");
        Ok(location)
    }

    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        let location = {
            let index = self.index.read().await;
            match index.lookup(id) {
                Ok(location) => location,
                Err(_) => return Ok(None),
            }
        };

        match self.db.get_cf(self.cf(CF_ACCOUNTS)?, location.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn commit(&self, accounts: Vec<Account>) -> Result<()> {
        let index = self.index.write().await;
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut batch = WriteBatch::default();
        for account in &accounts {
            let location = index.lookup(&account.account_num)?;
            batch.put_cf(cf, location.to_be_bytes(), serde_json::to_vec(account)?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        let _index = self.index.read().await;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_ACCOUNTS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(serde_json::from_slice(&value)?);
        }
        Ok(accounts)
    }

    async fn clear(&self) -> Result<()> {
        let mut index = self.index.write().await;
        let mut batch = WriteBatch::default();
        self.clear_cf(&mut batch, CF_ACCOUNTS)?;
        self.clear_cf(&mut batch, CF_ACCOUNT_INDEX)?;
        batch.delete_cf(self.cf(CF_META)?, SCHEMA_KEY);
        self.db.write(batch)?;
        *index = UniqueIndex::new();
        Ok(())
    }

    async fn install_schema(&self, schema: Schema) -> Result<()> {
        let _index = self.index.write().await;
        self.db
            .put_cf(self.cf(CF_META)?, SCHEMA_KEY, serde_json::to_vec(&schema)?)?;
        Ok(())
    }

    async fn schema(&self) -> Result<Option<Schema>> {
        match self.db.get_cf(self.cf(CF_META)?, SCHEMA_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TransferStore for RocksDBStore {
    async fn next_id(&self) -> Result<TransferId> {
        Ok(self.next_transfer_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn store(&self, transfer: Transfer) -> Result<()> {
        self.db.put_cf(
            self.cf(CF_TRANSFERS)?,
            transfer.id.to_be_bytes(),
            serde_json::to_vec(&transfer)?,
        )?;
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>> {
        match self.db.get_cf(self.cf(CF_TRANSFERS)?, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<Transfer>> {
        let mut transfers = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_TRANSFERS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            transfers.push(serde_json::from_slice(&value)?);
        }
        Ok(transfers)
    }

    async fn clear(&self) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.clear_cf(&mut batch, CF_TRANSFERS)?;
        self.db.write(batch)?;
        self.next_transfer_id.store(0, Ordering::SeqCst);
        Ok(())
    }
}
