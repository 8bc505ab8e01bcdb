use std::sync::Arc;

use serde::Serialize;

use crate::publishing::domain::artifact_publisher::ArtifactPublisher;
use crate::publishing::domain::upload_ledger::UploadLedger;
use crate::publishing::infrastructure::pending_spool::PendingSpool;
use crate::storage::domain::signature_store::SignatureStore;
use crate::storage::domain::store_error::StoreError;

/// Outcome of one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Registered records without a ledger entry.
    pub scanned: usize,
    pub published: usize,
    /// Unpublished records whose image bytes are not in the spool.
    pub missing_artifact: usize,
    pub failed: usize,
}

/// Republishes registered faces that never made it into the upload ledger.
pub struct ReconcileUploadsUseCase {
    store: Arc<SignatureStore>,
    ledger: Arc<UploadLedger>,
    publisher: Arc<dyn ArtifactPublisher>,
    spool: PendingSpool,
}

impl ReconcileUploadsUseCase {
    pub fn new(
        store: Arc<SignatureStore>,
        ledger: Arc<UploadLedger>,
        publisher: Arc<dyn ArtifactPublisher>,
        spool: PendingSpool,
    ) -> Self {
        Self {
            store,
            ledger,
            publisher,
            spool,
        }
    }

    /// Only spool I/O errors abort the pass; publish failures are counted and
    /// left for the next one.
    pub fn execute(&self) -> Result<ReconcileReport, StoreError> {
        let mut report = ReconcileReport::default();

        for record in self.store.records() {
            let id = &record.storage_id;
            if self.ledger.contains(id) {
                continue;
            }
            report.scanned += 1;

            let Some(image) = self.spool.load(id)? else {
                log::warn!("No spooled image for unpublished record {id}");
                report.missing_artifact += 1;
                continue;
            };

            match self
                .publisher
                .publish(id, &image, &record.signature, &record.timestamp)
            {
                Ok(url) => {
                    log::info!("Reconciled {id} -> {url}");
                    self.spool.remove(id)?;
                    report.published += 1;
                }
                Err(e) => {
                    log::warn!("Reconciliation publish of {id} failed: {e}");
                    report.failed += 1;
                }
            }
        }

        // Spool entries already covered by the ledger (publish succeeded but
        // removal was interrupted) are just clutter.
        for id in self.spool.ids()? {
            if self.ledger.contains(&id) {
                self.spool.remove(&id)?;
            }
        }

        Ok(report)
    }
}
