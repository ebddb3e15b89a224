use crate::domain::account::AccountId;
use crate::error::{LedgerError, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::{Instant, timeout_at};
use tracing::debug;

type LockTable = Arc<Mutex<HashMap<AccountId, Arc<AsyncMutex<()>>>>>;

/// Per-account exclusive locks.
///
/// Locks are always taken in ascending `AccountId` order, so two units touching
/// the same accounts in opposite directions cannot wait on each other. The whole
/// acquisition shares one deadline; on expiry the caller gets `Contention`.
///
/// The table only tracks accounts that are locked or being waited on. An entry is
/// removed once the last [`LockSet`] using it is dropped.
pub struct LockManager {
    table: LockTable,
    timeout: Duration,
}

/// Guards held by one atomic unit. Dropping it releases every lock.
pub struct LockSet {
    table: LockTable,
    held: Vec<(AccountId, OwnedMutexGuard<()>)>,
}

impl LockSet {
    pub fn covers(&self, id: &AccountId) -> bool {
        self.held.iter().any(|(held, _)| held == id)
    }

    /// Held identifiers in acquisition order.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.held.iter().map(|(id, _)| id)
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        let ids: Vec<AccountId> = self.held.drain(..).map(|(id, _guard)| id).collect();
        prune(&self.table, &ids);
    }
}

fn lock_table(table: &LockTable) -> MutexGuard<'_, HashMap<AccountId, Arc<AsyncMutex<()>>>> {
    // the map stays consistent even if a holder panicked
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drops entries nobody holds or waits on; the table's own handle is the only one left.
fn prune(table: &LockTable, ids: &[AccountId]) {
    let mut locks = lock_table(table);
    for id in ids {
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }
}

impl LockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    fn lock_for(&self, id: &AccountId) -> Arc<AsyncMutex<()>> {
        lock_table(&self.table)
            .entry(id.clone())
            .or_default()
            .clone()
    }

    /// Acquires every account in `ids`, in identifier order, within the configured timeout.
    pub async fn acquire<'a, I>(&self, ids: I) -> Result<LockSet>
    where
        I: IntoIterator<Item = &'a AccountId>,
    {
        let ordered: BTreeSet<&AccountId> = ids.into_iter().collect();
        let deadline = Instant::now() + self.timeout;
        let mut set = LockSet {
            table: Arc::clone(&self.table),
            held: Vec::with_capacity(ordered.len()),
        };

        for id in ordered {
            let lock = self.lock_for(id);
            match timeout_at(deadline, lock.lock_owned()).await {
                Ok(guard) => set.held.push((id.clone(), guard)),
                Err(_) => {
                    debug!(account = %id, waited = ?self.timeout, "lock acquisition timed out");
                    prune(&self.table, std::slice::from_ref(id));
                    return Err(LedgerError::Contention {
                        account: id.clone(),
                        waited: self.timeout,
                    });
                }
            }
        }
        Ok(set)
    }
}
