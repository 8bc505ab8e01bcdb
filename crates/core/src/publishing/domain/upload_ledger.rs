use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::storage::domain::store_error::StoreError;

/// Durable backing for the [`UploadLedger`].
pub trait LedgerRepository: Send + Sync {
    /// Ids in the order they were marked. Missing storage is an empty ledger.
    fn load(&self) -> Result<Vec<String>, StoreError>;

    /// Persists the full id list; must be durable on `Ok`.
    fn commit(&mut self, ids: &[String]) -> Result<(), StoreError>;

    fn location(&self) -> String;
}

/// Storage ids whose artifact and record are confirmed published.
///
/// Guards publish side effects against repeated delivery. It says nothing
/// about logical duplicates, which the corpus already excludes.
pub struct UploadLedger {
    state: RwLock<LedgerState>,
}

struct LedgerState {
    ids: Vec<String>,
    index: HashSet<String>,
    repository: Box<dyn LedgerRepository>,
}

impl UploadLedger {
    pub fn load(repository: Box<dyn LedgerRepository>) -> Result<Self, StoreError> {
        let loaded = repository.load()?;
        let mut ids = Vec::with_capacity(loaded.len());
        let mut index = HashSet::with_capacity(loaded.len());
        for id in loaded {
            if index.insert(id.clone()) {
                ids.push(id);
            } else {
                log::warn!("Ignoring repeated ledger entry {id} in {}", repository.location());
            }
        }
        log::info!(
            "Loaded {} published ids from {}",
            ids.len(),
            repository.location()
        );
        Ok(Self {
            state: RwLock::new(LedgerState {
                ids,
                index,
                repository,
            }),
        })
    }

    pub fn contains(&self, storage_id: &str) -> bool {
        self.read().index.contains(storage_id)
    }

    /// Records `storage_id` as published and persists the ledger.
    ///
    /// Returns `false` without writing if the id was already present.
    pub fn mark_published(&self, storage_id: &str) -> Result<bool, StoreError> {
        let mut state = self.write();
        if state.index.contains(storage_id) {
            return Ok(false);
        }

        let LedgerState {
            ids,
            index,
            repository,
        } = &mut *state;
        ids.push(storage_id.to_string());
        if let Err(e) = repository.commit(ids) {
            ids.pop();
            return Err(e);
        }
        index.insert(storage_id.to_string());
        Ok(true)
    }

    pub fn ids(&self) -> Vec<String> {
        self.read().ids.clone()
    }

    pub fn len(&self) -> usize {
        self.read().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
