use serde::{Deserialize, Serialize};

use crate::shared::signature::Signature;

/// One accepted-unique face. Created once at registration, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaceRecord {
    pub signature: Signature,
    /// Caller-supplied, not validated for format or monotonicity.
    pub timestamp: String,
    pub filename: String,
    /// Empty in corpora written before ids were persisted; the store assigns
    /// one on load.
    #[serde(default)]
    pub storage_id: String,
}

impl FaceRecord {
    /// Builds a record with its filename derived from `timestamp`.
    pub fn new(signature: Signature, timestamp: &str, storage_id: String) -> Self {
        Self {
            signature,
            timestamp: timestamp.to_string(),
            filename: derive_filename(timestamp),
            storage_id,
        }
    }
}

pub fn derive_filename(timestamp: &str) -> String {
    format!("face_{timestamp}.jpg")
}

/// Fresh opaque id for the artifact store: 32 lowercase hex characters.
pub fn new_storage_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
