use std::time::Duration;

use backoff::ExponentialBackoffBuilder;

use crate::publishing::domain::artifact_publisher::ArtifactPublisher;
use crate::publishing::domain::publish_error::PublishError;
use crate::shared::signature::Signature;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Retries transient publish failures with exponential backoff, up to a
/// bounded number of attempts. Permanent failures are returned immediately.
pub struct RetryingPublisher<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: ArtifactPublisher> RetryingPublisher<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<P: ArtifactPublisher> ArtifactPublisher for RetryingPublisher<P> {
    fn publish(
        &self,
        storage_id: &str,
        image: &[u8],
        signature: &Signature,
        timestamp: &str,
    ) -> Result<String, PublishError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.policy.initial_backoff)
            .with_max_interval(self.policy.max_backoff)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0u32;
        let operation = || {
            attempt += 1;
            self.inner
                .publish(storage_id, image, signature, timestamp)
                .map_err(|e| {
                    if e.is_transient() && attempt < max_attempts {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
        };
        let notify = |e: PublishError, wait: Duration| {
            log::warn!(
                "Publish of {storage_id} failed ({e}), retrying in {}ms",
                wait.as_millis()
            );
        };

        backoff::retry_notify(policy, operation, notify).map_err(|e| match e {
            backoff::Error::Permanent(e) => e,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}
