use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::encoding::domain::face_encoder::{EncodeError, FaceEncoder};
use crate::matching::domain::similarity_matcher::SimilarityMatcher;
use crate::pipeline::submission_stats::SubmissionStats;
use crate::publishing::domain::artifact_publisher::ArtifactPublisher;
use crate::publishing::infrastructure::pending_spool::PendingSpool;
use crate::shared::face_record::{new_storage_id, FaceRecord};
use crate::storage::domain::signature_store::SignatureStore;
use crate::storage::domain::store_error::StoreError;

/// Whether a registered face's artifact reached the external store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Publication {
    Published { url: String },
    /// Publish failed; the registration stands and a later pass will retry.
    Pending,
}

/// Terminal outcome of one submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    NoFaceDetected,
    Duplicate,
    Registered {
        filename: String,
        publication: Publication,
    },
}

impl Decision {
    pub fn is_unique(&self) -> bool {
        matches!(self, Decision::Registered { .. })
    }
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("encoder produced a {actual}-dimensional signature, corpus expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("failed to persist registration: {0}")]
    StorageFailure(#[source] StoreError),
}

/// Decides whether a submitted face is new and registers it exactly once.
///
/// Snapshot, match and append run under one registration lock, so two
/// concurrent submissions of the same face cannot both register. Encoding
/// happens before the lock and publishing after it.
pub struct DedupCoordinator {
    encoder: Box<dyn FaceEncoder>,
    matcher: SimilarityMatcher,
    store: Arc<SignatureStore>,
    registration: Mutex<()>,
    publisher: Arc<dyn ArtifactPublisher>,
    spool: Option<PendingSpool>,
    stats: Arc<SubmissionStats>,
}

impl DedupCoordinator {
    pub fn new(
        encoder: Box<dyn FaceEncoder>,
        matcher: SimilarityMatcher,
        store: Arc<SignatureStore>,
        publisher: Arc<dyn ArtifactPublisher>,
        stats: Arc<SubmissionStats>,
    ) -> Self {
        Self {
            encoder,
            matcher,
            store,
            registration: Mutex::new(()),
            publisher,
            spool: None,
            stats,
        }
    }

    /// Keeps the image bytes of registrations whose publish failed, for
    /// the reconciliation pass.
    pub fn with_spool(mut self, spool: PendingSpool) -> Self {
        self.spool = Some(spool);
        self
    }

    pub fn store(&self) -> &Arc<SignatureStore> {
        &self.store
    }

    pub fn stats(&self) -> &Arc<SubmissionStats> {
        &self.stats
    }

    pub fn matcher(&self) -> SimilarityMatcher {
        self.matcher
    }

    pub fn submit(&self, image: &[u8], timestamp: &str) -> Result<Decision, SubmitError> {
        let signature = match self.encoder.encode(image) {
            Ok(Some(signature)) => signature,
            Ok(None) => {
                log::debug!("No face detected in submission at {timestamp}");
                self.stats.record_no_face();
                return Ok(Decision::NoFaceDetected);
            }
            Err(e) => {
                self.stats.record_encode_failure();
                return Err(e.into());
            }
        };

        let expected = self.store.dimension();
        if signature.len() != expected {
            self.stats.record_encode_failure();
            return Err(SubmitError::DimensionMismatch {
                expected,
                actual: signature.len(),
            });
        }

        let record = {
            // Guards no data; poisoning carries no meaning here.
            let _registration = self
                .registration
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let corpus = self.store.snapshot();
            if self.matcher.is_duplicate(&signature, &corpus) {
                if log::log_enabled!(log::Level::Debug) {
                    if let Some((index, distance)) = self.matcher.nearest(&signature, &corpus) {
                        log::debug!("Duplicate of record {index} (distance {distance:.4})");
                    }
                }
                self.stats.record_duplicate();
                return Ok(Decision::Duplicate);
            }

            let record = FaceRecord::new(signature, timestamp, new_storage_id());
            // Spooled before the append so a registered face always has its
            // bytes on disk until the publish is confirmed.
            self.spool_image(&record.storage_id, image);
            if let Err(e) = self.store.append(record.clone()) {
                log::error!("Failed to register {}: {e}", record.filename);
                self.discard_spooled(&record.storage_id);
                self.stats.record_storage_failure();
                return Err(SubmitError::StorageFailure(e));
            }
            record
        };

        log::info!(
            "Registered {} as {} ({} faces)",
            record.filename,
            record.storage_id,
            self.store.len()
        );
        self.stats.record_registered();

        let publication = self.publish(&record, image);
        Ok(Decision::Registered {
            filename: record.filename,
            publication,
        })
    }

    fn publish(&self, record: &FaceRecord, image: &[u8]) -> Publication {
        match self.publisher.publish(
            &record.storage_id,
            image,
            &record.signature,
            &record.timestamp,
        ) {
            Ok(url) => {
                self.discard_spooled(&record.storage_id);
                Publication::Published { url }
            }
            Err(e) => {
                log::warn!(
                    "Publish of {} failed, leaving it pending: {e}",
                    record.storage_id
                );
                self.stats.record_publish_pending();
                Publication::Pending
            }
        }
    }

    fn spool_image(&self, storage_id: &str, image: &[u8]) {
        if let Some(spool) = &self.spool {
            if let Err(e) = spool.stash(storage_id, image) {
                log::error!("Failed to spool {storage_id} for retry: {e}");
            }
        }
    }

    fn discard_spooled(&self, storage_id: &str) {
        if let Some(spool) = &self.spool {
            if let Err(e) = spool.remove(storage_id) {
                log::warn!("Failed to clear spooled image {storage_id}: {e}");
            }
        }
    }
}
