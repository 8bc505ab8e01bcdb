use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::publishing::domain::artifact_store::ArtifactStore;
use crate::publishing::domain::publish_error::PublishError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Object storage reached over plain HTTP `PUT {endpoint}/{bucket}/{key}`.
///
/// Objects are served from `{public_base}/{bucket}/{key}`; the bucket is
/// expected to allow public reads.
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    public_base: String,
    bucket: String,
    token: Option<String>,
}

impl HttpObjectStore {
    /// Must not be called from inside an async runtime: the blocking client
    /// owns its own.
    pub fn new(
        endpoint: &str,
        public_base: Option<&str>,
        bucket: &str,
        token: Option<String>,
    ) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PublishError::Transport {
                endpoint: endpoint.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let public_base = public_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| endpoint.clone());
        Ok(Self {
            client,
            endpoint,
            public_base,
            bucket: bucket.to_string(),
            token,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{key}", self.endpoint, self.bucket)
    }
}

impl ArtifactStore for HttpObjectStore {
    fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, PublishError> {
        let url = self.object_url(key);
        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| PublishError::Transport {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(PublishError::Rejected {
                endpoint: url,
                status: response.status().as_u16(),
            });
        }
        log::debug!("Uploaded {} bytes to {url}", bytes.len());
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{key}", self.public_base, self.bucket)
    }
}
