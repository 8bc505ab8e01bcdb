use std::time::Duration;

use reqwest::blocking::Client;

use crate::publishing::domain::artifact_store::{FaceDocument, RecordStore};
use crate::publishing::domain::publish_error::PublishError;
use crate::shared::constants::RECORD_COLLECTION;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Document database reached over HTTP: `PUT {endpoint}/faces/{id}` with a
/// JSON body.
pub struct HttpRecordStore {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpRecordStore {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PublishError::Transport {
                endpoint: endpoint.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn document_url(&self, storage_id: &str) -> String {
        format!("{}/{RECORD_COLLECTION}/{storage_id}", self.endpoint)
    }
}

impl RecordStore for HttpRecordStore {
    fn put(&self, storage_id: &str, document: &FaceDocument) -> Result<(), PublishError> {
        let url = self.document_url(storage_id);
        let mut request = self.client.put(&url).json(document);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| PublishError::Transport {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                endpoint: url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
