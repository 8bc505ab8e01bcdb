use std::path::{Path, PathBuf};

use crate::shared::face_record::FaceRecord;
use crate::storage::domain::corpus_repository::CorpusRepository;
use crate::storage::domain::store_error::StoreError;
use crate::storage::infrastructure::json_file::{read_optional, write_atomic};

/// Stores the corpus as a single JSON array, rewritten wholesale on every
/// append.
pub struct JsonCorpusRepository {
    path: PathBuf,
}

impl JsonCorpusRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusRepository for JsonCorpusRepository {
    fn load(&self) -> Result<Vec<FaceRecord>, StoreError> {
        Ok(read_optional(&self.path)?.unwrap_or_default())
    }

    fn commit(&mut self, records: &[FaceRecord], _appended: &FaceRecord) -> Result<(), StoreError> {
        write_atomic(&self.path, records, "face corpus")
    }

    fn rewrite(&mut self, records: &[FaceRecord]) -> Result<(), StoreError> {
        write_atomic(&self.path, records, "face corpus")
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
