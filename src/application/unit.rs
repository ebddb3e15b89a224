use crate::application::accounts::AccountService;
use crate::application::locks::LockSet;
use crate::domain::account::{Account, AccountId};
use crate::domain::schema::SchemaViolation;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// A group of balance changes applied entirely or not at all.
///
/// Deltas are staged in memory while the unit holds the locks of every account it
/// may touch. Nothing reaches the store until [`AtomicUnit::commit`], which writes
/// all staged records in one batch. Dropping the unit, or calling
/// [`AtomicUnit::abort`], discards the staged changes and releases the locks.
pub struct AtomicUnit<'a> {
    accounts: &'a AccountService,
    locks: LockSet,
    staged: BTreeMap<AccountId, Account>,
}

impl<'a> AtomicUnit<'a> {
    pub(crate) fn new(accounts: &'a AccountService, locks: LockSet) -> Self {
        Self {
            accounts,
            locks,
            staged: BTreeMap::new(),
        }
    }

    /// Stages `balance + delta` for `id`, reading through earlier staged changes.
    ///
    /// The candidate record must pass the schema and keep the balance non-negative.
    pub async fn apply_delta(&mut self, id: &AccountId, delta: Decimal) -> Result<Account> {
        if !self.locks.covers(id) {
            return Err(LedgerError::InvalidRequest(format!(
                "account {id} is not locked by this unit"
            )));
        }

        let current = match self.staged.get(id) {
            Some(staged) => staged.clone(),
            None => self
                .accounts
                .store()
                .get(id)
                .await?
                .ok_or_else(|| LedgerError::NotFound(id.clone()))?,
        };

        let candidate = current.with_delta(delta)?;
        if let Err(violation) = self.accounts.validator().validate(&candidate.to_document()) {
            return Err(match violation {
                SchemaViolation::OutOfRange { .. } if delta < Decimal::ZERO => {
                    insufficient_funds(&current, delta)
                }
                other => LedgerError::Invalid(other),
            });
        }
        if candidate.balance.is_negative() {
            return Err(insufficient_funds(&current, delta));
        }

        debug!(account = %id, %delta, balance = %candidate.balance, "staged delta");
        self.staged.insert(id.clone(), candidate.clone());
        Ok(candidate)
    }

    /// The balance the unit would commit for `id`, if it changed it.
    pub fn staged(&self, id: &AccountId) -> Option<&Account> {
        self.staged.get(id)
    }

    /// Writes every staged record atomically, then releases the locks.
    pub async fn commit(self) -> Result<Vec<Account>> {
        let accounts: Vec<Account> = self.staged.into_values().collect();
        if !accounts.is_empty() {
            self.accounts.store().commit(accounts.clone()).await?;
        }
        Ok(accounts)
    }

    /// Discards the staged changes. Storage is left as it was before the unit began.
    pub fn abort(self) {
        debug!(discarded = self.staged.len(), "aborted atomic unit");
    }
}

fn insufficient_funds(current: &Account, delta: Decimal) -> LedgerError {
    LedgerError::InsufficientFunds {
        account: current.account_num.clone(),
        balance: current.balance.value(),
        requested: -delta,
    }
}
