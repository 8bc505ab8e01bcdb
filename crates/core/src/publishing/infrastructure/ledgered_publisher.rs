use std::sync::Arc;

use crate::publishing::domain::artifact_publisher::ArtifactPublisher;
use crate::publishing::domain::artifact_store::{artifact_key, ArtifactStore, FaceDocument, RecordStore};
use crate::publishing::domain::publish_error::PublishError;
use crate::publishing::domain::upload_ledger::UploadLedger;
use crate::publishing::infrastructure::jpeg_reencoder::{reencode_jpeg, JPEG_CONTENT_TYPE};
use crate::shared::signature::Signature;

/// Publishes a face as a JPEG artifact plus a record document, consulting
/// the [`UploadLedger`] so an id is uploaded at most once.
///
/// The ledger entry is written only after both writes succeed. A failure in
/// between leaves the id unmarked, and the next call repeats both writes;
/// each store overwrites by key, so the repeat is harmless.
pub struct LedgeredPublisher {
    artifacts: Box<dyn ArtifactStore>,
    records: Box<dyn RecordStore>,
    ledger: Arc<UploadLedger>,
}

impl LedgeredPublisher {
    pub fn new(
        artifacts: Box<dyn ArtifactStore>,
        records: Box<dyn RecordStore>,
        ledger: Arc<UploadLedger>,
    ) -> Self {
        Self {
            artifacts,
            records,
            ledger,
        }
    }
}

impl ArtifactPublisher for LedgeredPublisher {
    fn publish(
        &self,
        storage_id: &str,
        image: &[u8],
        signature: &Signature,
        timestamp: &str,
    ) -> Result<String, PublishError> {
        let key = artifact_key(storage_id);
        if self.ledger.contains(storage_id) {
            log::debug!("{storage_id} already published, skipping upload");
            return Ok(self.artifacts.public_url(&key));
        }

        let jpeg = reencode_jpeg(image)?;
        let url = self.artifacts.upload(&key, &jpeg, JPEG_CONTENT_TYPE)?;
        let document = FaceDocument {
            encoding: signature.to_vec(),
            url: url.clone(),
            timestamp: timestamp.to_string(),
        };
        self.records.put(storage_id, &document)?;
        self.ledger.mark_published(storage_id)?;

        log::info!("Published {storage_id} to {url}");
        Ok(url)
    }
}
