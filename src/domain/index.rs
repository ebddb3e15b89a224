use crate::domain::account::AccountId;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage slot of an account record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordLocation(pub u64);

impl RecordLocation {
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        Some(Self(u64::from_be_bytes(raw)))
    }
}

/// One-to-one mapping from account identifier to record location.
///
/// Backends mutate it under the same write lock as the record itself, so the
/// index and the records never disagree.
#[derive(Debug, Default, Clone)]
pub struct UniqueIndex {
    entries: HashMap<AccountId, RecordLocation>,
    next_location: u64,
}

impl UniqueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index from persisted `(id, location)` pairs.
    pub fn build<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (AccountId, RecordLocation)>,
    {
        let mut index = Self::new();
        for (id, location) in entries {
            index.insert(id, location)?;
        }
        Ok(index)
    }

    /// Hands out the next unused location.
    pub fn allocate(&mut self) -> RecordLocation {
        let location = RecordLocation(self.next_location);
        self.next_location += 1;
        location
    }

    pub fn insert(&mut self, id: AccountId, location: RecordLocation) -> Result<()> {
        if self.entries.contains_key(&id) {
            return Err(LedgerError::DuplicateKey(id));
        }
        self.next_location = self.next_location.max(location.0 + 1);
        self.entries.insert(id, location);
        Ok(())
    }

    pub fn lookup(&self, id: &AccountId) -> Result<RecordLocation> {
        self.entries
            .get(id)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.entries.contains_key(id)
    }

    /// Undoes an insert whose record write failed.
    pub fn remove(&mut self, id: &AccountId) -> Option<RecordLocation> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
