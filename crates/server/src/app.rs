//! Process wiring: stores, publisher chain, coordinator and background worker.

use std::fs;
use std::sync::Arc;

use facedup_core::encoding::domain::face_encoder::FaceEncoder;
use facedup_core::matching::domain::similarity_matcher::SimilarityMatcher;
use facedup_core::pipeline::dedup_coordinator::DedupCoordinator;
use facedup_core::pipeline::infrastructure::reconcile_worker::ReconcileWorker;
use facedup_core::pipeline::reconcile_uploads_use_case::ReconcileUploadsUseCase;
use facedup_core::pipeline::submission_stats::SubmissionStats;
use facedup_core::publishing::domain::artifact_publisher::ArtifactPublisher;
use facedup_core::publishing::domain::artifact_store::{ArtifactStore, RecordStore};
use facedup_core::publishing::domain::upload_ledger::UploadLedger;
use facedup_core::publishing::infrastructure::http_object_store::HttpObjectStore;
use facedup_core::publishing::infrastructure::http_record_store::HttpRecordStore;
use facedup_core::publishing::infrastructure::ledgered_publisher::LedgeredPublisher;
use facedup_core::publishing::infrastructure::local_artifact_store::{
    LocalArtifactStore, LocalRecordStore,
};
use facedup_core::publishing::infrastructure::pending_spool::PendingSpool;
use facedup_core::publishing::infrastructure::retrying_publisher::{RetryPolicy, RetryingPublisher};
use facedup_core::shared::constants::{
    CORPUS_FILENAME, CORPUS_LOG_FILENAME, LEDGER_FILENAME, PENDING_DIRNAME,
};
use facedup_core::storage::domain::corpus_repository::CorpusRepository;
use facedup_core::storage::domain::signature_store::SignatureStore;
use facedup_core::storage::infrastructure::append_log_corpus_repository::AppendLogCorpusRepository;
use facedup_core::storage::infrastructure::json_corpus_repository::JsonCorpusRepository;
use facedup_core::storage::infrastructure::json_ledger_repository::JsonLedgerRepository;

use crate::config::{ArtifactBackend, Config, StoreFormat};
use crate::state::AppState;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A fully wired service. Owns the reconcile worker, which stops on
/// [`App::shutdown`] or drop.
///
/// Builds blocking HTTP clients when the HTTP backend is configured, so it
/// must be constructed and dropped outside an async runtime in that case.
pub struct App {
    state: AppState,
    worker: Option<ReconcileWorker>,
}

impl App {
    pub fn build(config: &Config, encoder: Box<dyn FaceEncoder>) -> Result<Self, BoxError> {
        let threshold = config.threshold()?;
        fs::create_dir_all(&config.data_dir)?;

        let repository: Box<dyn CorpusRepository> = match config.store_format {
            StoreFormat::Document => Box::new(JsonCorpusRepository::new(
                config.data_dir.join(CORPUS_FILENAME),
            )),
            StoreFormat::Log => Box::new(AppendLogCorpusRepository::new(
                config.data_dir.join(CORPUS_LOG_FILENAME),
            )),
        };
        let store = Arc::new(SignatureStore::load(repository, encoder.dimension())?);
        let ledger = Arc::new(UploadLedger::load(Box::new(JsonLedgerRepository::new(
            config.data_dir.join(LEDGER_FILENAME),
        )))?);

        let (artifacts, records) = build_stores(config)?;
        let policy = RetryPolicy {
            max_attempts: config.publish_attempts,
            initial_backoff: config.publish_backoff(),
            ..RetryPolicy::default()
        };
        let publisher: Arc<dyn ArtifactPublisher> = Arc::new(RetryingPublisher::new(
            LedgeredPublisher::new(artifacts, records, Arc::clone(&ledger)),
            policy,
        ));

        let pending_dir = config.data_dir.join(PENDING_DIRNAME);
        let coordinator = DedupCoordinator::new(
            encoder,
            SimilarityMatcher::new(threshold),
            Arc::clone(&store),
            Arc::clone(&publisher),
            Arc::new(SubmissionStats::new()),
        )
        .with_spool(PendingSpool::new(&pending_dir));

        let worker = match config.reconcile_interval() {
            Some(interval) => {
                let use_case = ReconcileUploadsUseCase::new(
                    store,
                    Arc::clone(&ledger),
                    publisher,
                    PendingSpool::new(&pending_dir),
                );
                log::info!("Reconciling uploads every {}s", interval.as_secs());
                Some(ReconcileWorker::spawn(use_case, interval)?)
            }
            None => None,
        };

        Ok(Self {
            state: AppState {
                coordinator: Arc::new(coordinator),
                ledger,
            },
            worker,
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Stops the reconcile worker and logs the submission summary.
    pub fn shutdown(mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        if let Some(summary) = self.state.coordinator.stats().summary_string() {
            log::info!("{summary}");
        }
    }
}

fn build_stores(
    config: &Config,
) -> Result<(Box<dyn ArtifactStore>, Box<dyn RecordStore>), BoxError> {
    match config.artifact_backend {
        ArtifactBackend::Local => {
            let root = config.artifact_dir();
            log::info!("Publishing artifacts to {}", root.display());
            Ok((
                Box::new(LocalArtifactStore::new(&root)),
                Box::new(LocalRecordStore::new(root.join("records"))),
            ))
        }
        ArtifactBackend::Http => {
            let bucket = config
                .bucket
                .as_deref()
                .ok_or("--bucket is required with --artifact-backend http")?;
            let records_endpoint = config
                .records_endpoint
                .as_deref()
                .ok_or("--records-endpoint is required with --artifact-backend http")?;
            log::info!(
                "Publishing artifacts to {}/{bucket}",
                config.storage_endpoint
            );
            Ok((
                Box::new(HttpObjectStore::new(
                    &config.storage_endpoint,
                    config.public_base_url.as_deref(),
                    bucket,
                    config.storage_token.clone(),
                )?),
                Box::new(HttpRecordStore::new(
                    records_endpoint,
                    config.storage_token.clone(),
                )?),
            ))
        }
    }
}
