use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{health, process_face, root, stats};
use crate::state::AppState;

/// Builds the application router. `body_limit` caps request bodies in bytes.
pub fn create_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/process_face", post(process_face))
        .route("/health", get(health))
        .route("/stats", get(stats))
        // Base64 images routinely exceed the extractor default, so the
        // tower layer is the only limit.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
