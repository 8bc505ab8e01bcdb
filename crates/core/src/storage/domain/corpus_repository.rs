use crate::shared::face_record::FaceRecord;
use crate::storage::domain::store_error::StoreError;

/// Durable backing for the face corpus.
///
/// Implementations choose their own layout (whole-document rewrite or
/// append log) but must have made `appended` durable before `commit`
/// returns `Ok`.
pub trait CorpusRepository: Send + Sync {
    /// Reads every persisted record in registration order. A missing store
    /// is an empty corpus; unreadable or malformed data is `CorruptStore`.
    fn load(&self) -> Result<Vec<FaceRecord>, StoreError>;

    /// Persists the corpus after `appended` was added. `records` already
    /// ends with `appended`.
    fn commit(&mut self, records: &[FaceRecord], appended: &FaceRecord) -> Result<(), StoreError>;

    /// Durably replaces the whole persisted corpus with `records`.
    fn rewrite(&mut self, records: &[FaceRecord]) -> Result<(), StoreError>;

    /// Human-readable location used in logs and errors.
    fn location(&self) -> String;
}
