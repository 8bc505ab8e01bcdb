pub mod artifact_publisher;
pub mod artifact_store;
pub mod publish_error;
pub mod upload_ledger;
