use std::path::PathBuf;

use thiserror::Error;

use crate::storage::domain::store_error::StoreError;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to re-encode image: {0}")]
    Reencode(String),
    #[error("transport error talking to {endpoint}: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} rejected the request with status {status}")]
    Rejected { endpoint: String, status: u16 },
    #[error("upload ledger: {0}")]
    Ledger(#[from] StoreError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Whether retrying the same call could succeed.
    ///
    /// Connection failures, server errors and throttling are transient;
    /// client rejections and undecodable images are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Io { .. } => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Reencode(_) | Self::Ledger(_) => false,
        }
    }

    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
