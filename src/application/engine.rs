use crate::application::accounts::AccountService;
use crate::application::locks::LockManager;
use crate::config::LedgerConfig;
use crate::domain::account::{Account, AccountId, Amount};
use crate::domain::operation::{Operation, OperationType};
use crate::domain::ports::{AccountStoreRef, TransferStoreRef};
use crate::domain::schema::SchemaValidator;
use crate::domain::transfer::{Entry, Transfer, TransferId};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Coordinates balance movements as atomic, journalled units.
///
/// Each call locks the accounts it touches (in identifier order), stages every
/// entry, and commits them in a single batch. The journal records the attempt as
/// `Pending` first and then `Committed` or `Aborted`; balances never show a
/// half-applied transfer.
///
/// `TransferEngine` is `Send + Sync` and is meant to be shared behind an `Arc`.
pub struct TransferEngine {
    accounts: AccountService,
    journal: TransferStoreRef,
}

impl TransferEngine {
    /// Creates a new `TransferEngine` over an already configured account service.
    pub fn new(accounts: AccountService, journal: TransferStoreRef) -> Self {
        Self { accounts, journal }
    }

    /// Opens an engine over the given stores.
    ///
    /// The schema installed in the store wins; a store without one gets
    /// `config.schema` installed.
    pub async fn open(
        store: AccountStoreRef,
        journal: TransferStoreRef,
        config: &LedgerConfig,
    ) -> Result<Self> {
        let schema = match store.schema().await? {
            Some(schema) => schema,
            None => {
                store.install_schema(config.schema.clone()).await?;
                config.schema.clone()
            }
        };
        let validator = SchemaValidator::new(schema)?;
        let locks = Arc::new(LockManager::new(config.lock_timeout));
        Ok(Self::new(
            AccountService::new(store, validator, locks),
            journal,
        ))
    }

    pub fn service(&self) -> &AccountService {
        &self.accounts
    }

    pub async fn create(&self, id: impl Into<AccountId>, balance: Decimal) -> Result<Account> {
        self.accounts.create(id, balance).await
    }

    pub async fn get(&self, id: &AccountId) -> Result<Account> {
        self.accounts.get(id).await
    }

    pub async fn apply_delta(&self, id: &AccountId, delta: Decimal) -> Result<Account> {
        self.accounts.apply_delta(id, delta).await
    }

    /// Moves `amount` from `from` to `to`, all or nothing.
    ///
    /// The debit is staged first; if it fails neither account changes. If the
    /// credit then fails the whole unit is dropped and the debit never lands.
    #[instrument(skip(self, from, to), fields(from = %from, to = %to))]
    pub async fn transfer(&self, from: &AccountId, to: &AccountId, amount: Decimal) -> Result<Transfer> {
        let amount = Amount::new(amount)?;
        if from == to {
            return Err(LedgerError::InvalidRequest(format!(
                "cannot transfer from account {from} to itself"
            )));
        }
        self.execute(vec![
            Entry::new(from.clone(), -amount.value()),
            Entry::new(to.clone(), amount.value()),
        ])
        .await
    }

    pub async fn deposit(&self, id: &AccountId, amount: Decimal) -> Result<Transfer> {
        let amount = Amount::new(amount)?;
        self.execute(vec![Entry::new(id.clone(), amount.value())])
            .await
    }

    pub async fn withdraw(&self, id: &AccountId, amount: Decimal) -> Result<Transfer> {
        let amount = Amount::new(amount)?;
        self.execute(vec![Entry::new(id.clone(), -amount.value())])
            .await
    }

    /// Applies `entries` in order as one atomic unit and journals the outcome.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn execute(&self, entries: Vec<Entry>) -> Result<Transfer> {
        if entries.is_empty() {
            return Err(LedgerError::InvalidRequest(
                "a transfer needs at least one entry".to_string(),
            ));
        }

        let id = self.journal.next_id().await?;
        let mut transfer = Transfer::pending(id, entries);
        self.journal.store(transfer.clone()).await?;

        match self.apply(&transfer.entries).await {
            Ok(()) => {
                transfer.commit();
                self.journal.store(transfer.clone()).await?;
                info!(id, "committed transfer");
                Ok(transfer)
            }
            Err(e) => {
                transfer.abort(e.reason());
                if let Err(journal_err) = self.journal.store(transfer).await {
                    warn!(id, error = %journal_err, "failed to journal aborted transfer");
                }
                info!(id, error = %e, "aborted transfer");
                Err(e)
            }
        }
    }

    async fn apply(&self, entries: &[Entry]) -> Result<()> {
        let mut unit = self
            .accounts
            .begin(entries.iter().map(|entry| &entry.account_num))
            .await?;
        for entry in entries {
            if let Err(e) = unit.apply_delta(&entry.account_num, entry.amount).await {
                unit.abort();
                return Err(e);
            }
        }
        let committed = unit.commit().await?;
        debug!(accounts = committed.len(), "applied entries");
        Ok(())
    }

    /// All accounts, ordered by identifier.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.accounts.all().await
    }

    /// The journal, ordered by transfer id.
    pub async fn transfers(&self) -> Result<Vec<Transfer>> {
        let mut transfers = self.journal.get_all().await?;
        transfers.sort_by_key(|transfer| transfer.id);
        Ok(transfers)
    }

    pub async fn transfer_by_id(&self, id: TransferId) -> Result<Option<Transfer>> {
        self.journal.get(id).await
    }

    /// Dispatches one row of an operations file.
    pub async fn process_operation(&self, op: Operation) -> Result<()> {
        match op.r#type {
            OperationType::Create => {
                self.accounts.create_document(op.document()).await?;
            }
            OperationType::Deposit => {
                self.deposit(op.account()?, op.amount()?).await?;
            }
            OperationType::Withdraw => {
                self.withdraw(op.account()?, op.amount()?).await?;
            }
            OperationType::Transfer => {
                self.transfer(op.account()?, op.to()?, op.amount()?).await?;
            }
        }
        Ok(())
    }
}
