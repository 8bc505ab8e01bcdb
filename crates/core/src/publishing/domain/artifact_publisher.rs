use crate::publishing::domain::publish_error::PublishError;
use crate::shared::signature::Signature;

/// Boundary to the external object store and record database.
///
/// Implementations must tolerate repeated calls for the same `storage_id`:
/// the coordinator and the reconciliation pass may both publish an id, and a
/// retried call must not produce a second upload.
pub trait ArtifactPublisher: Send + Sync {
    /// Uploads the image and its record, returning the public artifact URL.
    fn publish(
        &self,
        storage_id: &str,
        image: &[u8],
        signature: &Signature,
        timestamp: &str,
    ) -> Result<String, PublishError>;
}
