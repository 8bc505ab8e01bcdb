use std::sync::Arc;

use facedup_core::pipeline::dedup_coordinator::DedupCoordinator;
use facedup_core::publishing::domain::upload_ledger::UploadLedger;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DedupCoordinator>,
    pub ledger: Arc<UploadLedger>,
}
