//! HTTP transport and process wiring for the face deduplication engine.
//!
//! The binary uses these same pieces; integration tests drive the router
//! directly.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use app::App;
pub use config::Config;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
