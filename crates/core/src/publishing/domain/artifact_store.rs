use serde::{Deserialize, Serialize};

use crate::publishing::domain::publish_error::PublishError;
use crate::shared::constants::ARTIFACT_PREFIX;

/// Document written to the record database for every published face.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceDocument {
    pub encoding: Vec<f64>,
    pub url: String,
    pub timestamp: String,
}

/// Object storage for artifact bytes.
pub trait ArtifactStore: Send + Sync {
    /// Stores `bytes` under `key`, replacing any previous object, and returns
    /// its public URL.
    fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, PublishError>;

    /// URL an object under `key` is (or would be) served from.
    fn public_url(&self, key: &str) -> String;
}

/// Document database keyed by storage id.
pub trait RecordStore: Send + Sync {
    fn put(&self, storage_id: &str, document: &FaceDocument) -> Result<(), PublishError>;
}

pub fn artifact_key(storage_id: &str) -> String {
    format!("{ARTIFACT_PREFIX}/{storage_id}")
}
