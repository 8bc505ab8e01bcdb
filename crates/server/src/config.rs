use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use facedup_core::encoding::infrastructure::onnx_face_encoder::DEFAULT_CONFIDENCE;
use facedup_core::matching::domain::similarity_matcher::{InvalidThreshold, Threshold};
use facedup_core::shared::constants::DEFAULT_THRESHOLD;

const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreFormat {
    /// Single JSON document rewritten on every registration.
    Document,
    /// JSON lines, one record appended per registration.
    Log,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ArtifactBackend {
    /// Files under --artifact-dir.
    Local,
    /// Object store and record database over HTTP.
    Http,
}

/// Face deduplication service.
#[derive(Parser, Clone, Debug)]
#[command(name = "facedup-server", version)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "FACEDUP_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Maximum signature distance at which two faces count as the same.
    #[arg(long, env = "FACEDUP_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Directory holding the corpus, the upload ledger and the pending spool.
    #[arg(long, env = "FACEDUP_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// On-disk corpus layout.
    #[arg(long, env = "FACEDUP_STORE_FORMAT", value_enum, default_value = "document")]
    pub store_format: StoreFormat,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, env = "FACEDUP_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE)]
    pub confidence: f64,

    /// Directory with bundled models, checked before downloading.
    #[arg(long, env = "FACEDUP_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Where published faces go.
    #[arg(long, env = "FACEDUP_ARTIFACT_BACKEND", value_enum, default_value = "local")]
    pub artifact_backend: ArtifactBackend,

    /// Root for the local backend [default: <data-dir>/artifacts].
    #[arg(long, env = "FACEDUP_ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Bucket name for the HTTP backend.
    #[arg(long, env = "FACEDUP_BUCKET")]
    pub bucket: Option<String>,

    /// Object upload base URL for the HTTP backend.
    #[arg(long, env = "FACEDUP_STORAGE_ENDPOINT", default_value = DEFAULT_STORAGE_ENDPOINT)]
    pub storage_endpoint: String,

    /// Base for public artifact URLs [default: --storage-endpoint].
    #[arg(long, env = "FACEDUP_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    /// Record database base URL for the HTTP backend.
    #[arg(long, env = "FACEDUP_RECORDS_ENDPOINT")]
    pub records_endpoint: Option<String>,

    /// Bearer token sent to both HTTP stores.
    #[arg(long, env = "FACEDUP_STORAGE_TOKEN", hide_env_values = true)]
    pub storage_token: Option<String>,

    /// Publish attempts per face, including the first.
    #[arg(long, env = "FACEDUP_PUBLISH_ATTEMPTS", default_value = "3")]
    pub publish_attempts: u32,

    /// Initial delay between publish attempts, doubled each retry.
    #[arg(long, env = "FACEDUP_PUBLISH_BACKOFF_MS", default_value = "200")]
    pub publish_backoff_ms: u64,

    /// Seconds between upload reconciliation passes (0 disables).
    #[arg(long, env = "FACEDUP_RECONCILE_INTERVAL_SECS", default_value = "60")]
    pub reconcile_interval_secs: u64,

    /// Maximum request body size in MiB.
    #[arg(long, env = "FACEDUP_BODY_LIMIT_MB", default_value = "20")]
    pub body_limit_mb: usize,
}

impl Config {
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.threshold()?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )
            .into());
        }
        if self.publish_attempts == 0 {
            return Err("--publish-attempts must be at least 1".into());
        }
        if self.body_limit_mb == 0 {
            return Err("--body-limit-mb must be at least 1".into());
        }
        if self.artifact_backend == ArtifactBackend::Http {
            if self.bucket.as_deref().map_or(true, str::is_empty) {
                return Err("--bucket is required with --artifact-backend http".into());
            }
            if self.records_endpoint.as_deref().map_or(true, str::is_empty) {
                return Err("--records-endpoint is required with --artifact-backend http".into());
            }
        }
        Ok(())
    }

    pub fn threshold(&self) -> Result<Threshold, InvalidThreshold> {
        Threshold::new(self.threshold)
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("artifacts"))
    }

    pub fn publish_backoff(&self) -> Duration {
        Duration::from_millis(self.publish_backoff_ms)
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_secs > 0)
            .then(|| Duration::from_secs(self.reconcile_interval_secs))
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}
