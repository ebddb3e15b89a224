use crate::application::locks::LockManager;
use crate::application::unit::AtomicUnit;
use crate::domain::account::{Account, AccountId};
use crate::domain::ports::{AccountStore, AccountStoreRef};
use crate::domain::schema::{Document, SchemaValidator};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

/// Invariant-preserving operations on the `accounts` collection.
///
/// Every write goes through the schema validator, and every balance change runs
/// inside an [`AtomicUnit`] holding the account's lock.
#[derive(Clone)]
pub struct AccountService {
    store: AccountStoreRef,
    validator: Arc<SchemaValidator>,
    locks: Arc<LockManager>,
}

impl AccountService {
    pub fn new(store: AccountStoreRef, validator: SchemaValidator, locks: Arc<LockManager>) -> Self {
        Self {
            store,
            validator: Arc::new(validator),
            locks,
        }
    }

    pub(crate) fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    /// Creates an account. Fails with `Invalid` or `DuplicateKey`, writing nothing.
    pub async fn create(&self, id: impl Into<AccountId>, balance: Decimal) -> Result<Account> {
        self.create_document(Account::new(id, balance).to_document())
            .await
    }

    /// Creates an account from a raw record, which may be missing fields.
    #[instrument(skip_all)]
    pub async fn create_document(&self, doc: Document) -> Result<Account> {
        self.validator.validate(&doc)?;
        let account = Account::from_document(&doc)?;
        if account.balance.is_negative() {
            return Err(LedgerError::InvalidRequest(format!(
                "account {} cannot open with a negative balance",
                account.account_num
            )));
        }
        let location = self.store.insert(account.clone()).await?;
        info!(account = %account.account_num, balance = %account.balance, location = location.0, "created account");
        Ok(account)
    }

    pub async fn get(&self, id: &AccountId) -> Result<Account> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(id.clone()))
    }

    /// All accounts, ordered by identifier.
    pub async fn all(&self) -> Result<Vec<Account>> {
        let mut accounts = self.store.get_all().await?;
        accounts.sort_by(|a, b| a.account_num.cmp(&b.account_num));
        Ok(accounts)
    }

    /// Applies a signed delta to one account as its own atomic unit.
    ///
    /// A result below zero is rejected with `InsufficientFunds` and nothing is written.
    #[instrument(skip(self), fields(account = %id))]
    pub async fn apply_delta(&self, id: &AccountId, delta: Decimal) -> Result<Account> {
        let mut unit = self.begin([id]).await?;
        let account = unit.apply_delta(id, delta).await?;
        unit.commit().await?;
        Ok(account)
    }

    /// Locks `ids` in identifier order and opens an atomic unit over them.
    pub async fn begin<'a, I>(&self, ids: I) -> Result<AtomicUnit<'_>>
    where
        I: IntoIterator<Item = &'a AccountId>,
    {
        let locks = self.locks.acquire(ids).await?;
        Ok(AtomicUnit::new(self, locks))
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        use crate::domain::schema::Schema;
        use crate::infrastructure::in_memory::InMemoryAccountStore;
        use std::time::Duration;

        Self::new(
            Arc::new(InMemoryAccountStore::new()),
            SchemaValidator::new(Schema::accounts()).expect("default schema is valid"),
            Arc::new(LockManager::new(Duration::from_millis(100))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{ACCOUNT_NUM, BALANCE, Balance};
    use crate::domain::schema::{FieldValue, SchemaViolation};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_create_and_get() {
        let service = AccountService::in_memory();
        let created = service.create("acc1", dec!(100.0)).await.unwrap();
        assert_eq!(created.balance, Balance(dec!(100.0)));

        let fetched = service.get(&AccountId::from("acc1")).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_duplicate_keeps_original() {
        let service = AccountService::in_memory();
        service.create("acc1", dec!(100.0)).await.unwrap();

        let result = service.create("acc1", dec!(5.0)).await;
        assert!(matches!(result, Err(LedgerError::DuplicateKey(_))));
        let stored = service.get(&AccountId::from("acc1")).await.unwrap();
        assert_eq!(stored.balance, Balance(dec!(100.0)));
    }

    #[tokio::test]
    async fn test_create_negative_balance_is_invalid() {
        let service = AccountService::in_memory();
        let result = service.create("acc1", dec!(-1.0)).await;
        assert!(matches!(
            result,
            Err(LedgerError::Invalid(SchemaViolation::OutOfRange { .. }))
        ));
        assert!(matches!(
            service.get(&AccountId::from("acc1")).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_document_with_missing_field() {
        let service = AccountService::in_memory();
        let mut doc = Document::new();
        doc.insert(ACCOUNT_NUM, FieldValue::Text("acc1".to_string()));
        let result = service.create_document(doc).await;
        assert!(matches!(
            result,
            Err(LedgerError::Invalid(SchemaViolation::MissingField(field))) if field == BALANCE
        ));
    }

    #[tokio::test]
    async fn test_apply_delta() {
        let service = AccountService::in_memory();
        service.create("acc1", dec!(10.0)).await.unwrap();
        let id = AccountId::from("acc1");

        let updated = service.apply_delta(&id, dec!(5.5)).await.unwrap();
        assert_eq!(updated.balance, Balance(dec!(15.5)));

        let result = service.apply_delta(&id, dec!(-20.0)).await;
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(service.get(&id).await.unwrap().balance, Balance(dec!(15.5)));

        let drained = service.apply_delta(&id, dec!(-15.5)).await.unwrap();
        assert_eq!(drained.balance, Balance(dec!(0)));
    }

    #[tokio::test]
    async fn test_apply_delta_missing_account() {
        let service = AccountService::in_memory();
        let result = service.apply_delta(&AccountId::from("ghost"), dec!(1)).await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_all_sorted_by_identifier() {
        let service = AccountService::in_memory();
        service.create("b", dec!(1)).await.unwrap();
        service.create("a", dec!(2)).await.unwrap();
        let ids: Vec<String> = service
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.account_num.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
