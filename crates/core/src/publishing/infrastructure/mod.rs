pub mod http_object_store;
pub mod http_record_store;
pub mod jpeg_reencoder;
pub mod ledgered_publisher;
pub mod local_artifact_store;
pub mod pending_spool;
pub mod retrying_publisher;
