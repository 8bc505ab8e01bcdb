use std::path::PathBuf;

use crate::publishing::domain::upload_ledger::LedgerRepository;
use crate::storage::domain::store_error::StoreError;
use crate::storage::infrastructure::json_file::{read_optional, write_atomic};

/// Upload ledger persisted as a JSON array of storage ids.
pub struct JsonLedgerRepository {
    path: PathBuf,
}

impl JsonLedgerRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerRepository for JsonLedgerRepository {
    fn load(&self) -> Result<Vec<String>, StoreError> {
        Ok(read_optional(&self.path)?.unwrap_or_default())
    }

    fn commit(&mut self, ids: &[String]) -> Result<(), StoreError> {
        write_atomic(&self.path, ids, "upload ledger")
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
