//! Request handlers.

use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use facedup_core::pipeline::dedup_coordinator::Decision;
use facedup_core::pipeline::submission_stats::StatsSnapshot;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessFaceRequest {
    /// Base64-encoded image bytes in any common format.
    pub image: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessFaceResponse {
    pub is_unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl From<Decision> for ProcessFaceResponse {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Registered { filename, .. } => Self {
                is_unique: true,
                filename: Some(filename),
            },
            Decision::Duplicate | Decision::NoFaceDetected => Self {
                is_unique: false,
                filename: None,
            },
        }
    }
}

/// POST /process_face
///
/// Registers the face if it is new. Encoding, matching and the durable
/// append are blocking, so the submission runs on the blocking pool.
pub async fn process_face(
    State(state): State<AppState>,
    Json(request): Json<ProcessFaceRequest>,
) -> Result<Json<ProcessFaceResponse>, ApiError> {
    let image = BASE64
        .decode(request.image.trim())
        .map_err(|e| ApiError::bad_request(format!("image is not valid base64: {e}")))?;
    if image.is_empty() {
        return Err(ApiError::bad_request("image is empty"));
    }

    let coordinator = state.coordinator.clone();
    let timestamp = request.timestamp;
    let decision = tokio::task::spawn_blocking(move || coordinator.submit(&image, &timestamp))
        .await
        .map_err(|e| ApiError::internal(format!("submission task failed: {e}")))??;

    Ok(Json(decision.into()))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub corpus_size: usize,
    pub published: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        corpus_size: state.coordinator.store().len(),
        published: state.ledger.len(),
    })
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.coordinator.stats().snapshot())
}

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "Hello": "World" }))
}
