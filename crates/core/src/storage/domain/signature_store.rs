use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::shared::face_record::{new_storage_id, FaceRecord};
use crate::shared::signature::Signature;
use crate::storage::domain::corpus_repository::CorpusRepository;
use crate::storage::domain::store_error::StoreError;

/// The corpus of registered faces, held in memory and mirrored to a
/// [`CorpusRepository`].
///
/// `snapshot` and `append` are linearizable: an append is visible to every
/// snapshot that starts after it returns, and never visible before it has
/// been made durable. Deciding uniqueness across a snapshot and a later
/// append is the caller's job (see `DedupCoordinator`).
pub struct SignatureStore {
    dimension: usize,
    state: RwLock<StoreState>,
}

struct StoreState {
    records: Vec<FaceRecord>,
    ids: HashSet<String>,
    repository: Box<dyn CorpusRepository>,
}

impl SignatureStore {
    /// Reconstructs the store from its repository. Every record must carry a
    /// `dimension`-length signature and a distinct storage id.
    ///
    /// Records persisted without a storage id get a fresh one, and the
    /// corpus is rewritten before the store is returned.
    pub fn load(
        mut repository: Box<dyn CorpusRepository>,
        dimension: usize,
    ) -> Result<Self, StoreError> {
        let location = repository.location();
        let mut records = repository.load()?;

        let mut assigned = 0;
        for record in records.iter_mut().filter(|r| r.storage_id.is_empty()) {
            record.storage_id = new_storage_id();
            assigned += 1;
        }

        let mut ids = HashSet::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.signature.len() != dimension {
                return Err(StoreError::corrupt(
                    &location,
                    format!(
                        "record {index} has a {}-dimensional signature, expected {dimension}",
                        record.signature.len()
                    ),
                ));
            }
            if !ids.insert(record.storage_id.clone()) {
                return Err(StoreError::corrupt(
                    &location,
                    format!("record {index} repeats storage id {}", record.storage_id),
                ));
            }
        }

        if assigned > 0 {
            repository.rewrite(&records)?;
            log::info!("Assigned storage ids to {assigned} records in {location}");
        }

        log::info!("Loaded {} face records from {location}", records.len());
        Ok(Self {
            dimension,
            state: RwLock::new(StoreState {
                records,
                ids,
                repository,
            }),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Signatures of every registered face, in registration order.
    pub fn snapshot(&self) -> Vec<Signature> {
        self.read()
            .records
            .iter()
            .map(|r| r.signature.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<FaceRecord> {
        self.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, storage_id: &str) -> bool {
        self.read().ids.contains(storage_id)
    }

    /// Adds `record` and persists the corpus before returning.
    ///
    /// On any error the in-memory corpus is left exactly as it was.
    pub fn append(&self, record: FaceRecord) -> Result<(), StoreError> {
        if record.signature.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: record.signature.len(),
            });
        }

        let mut state = self.write();
        if state.ids.contains(&record.storage_id) {
            return Err(StoreError::DuplicateStorageId(record.storage_id));
        }

        let StoreState {
            records,
            ids,
            repository,
        } = &mut *state;
        records.push(record);
        let appended = &records[records.len() - 1];
        if let Err(e) = repository.commit(records, appended) {
            records.pop();
            return Err(e);
        }
        ids.insert(appended.storage_id.clone());
        Ok(())
    }

    // The state is only mutated after a successful commit, so a panic while
    // the lock was held cannot have left it half-updated.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
