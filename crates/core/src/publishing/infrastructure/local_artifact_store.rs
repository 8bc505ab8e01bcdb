//! Filesystem-backed artifact and record stores for development and tests.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::publishing::domain::artifact_store::{ArtifactStore, FaceDocument, RecordStore};
use crate::publishing::domain::publish_error::PublishError;
use crate::shared::constants::RECORD_COLLECTION;

/// Writes artifacts under `root/<key>` and serves them as `file://` URLs.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn upload(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String, PublishError> {
        write_file(&self.path_for(key), bytes)?;
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("file://{}", self.path_for(key).display())
    }
}

/// Writes one JSON document per id under `root/faces/<id>.json`.
pub struct LocalRecordStore {
    root: PathBuf,
}

impl LocalRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, storage_id: &str) -> PathBuf {
        self.root
            .join(RECORD_COLLECTION)
            .join(format!("{storage_id}.json"))
    }
}

impl RecordStore for LocalRecordStore {
    fn put(&self, storage_id: &str, document: &FaceDocument) -> Result<(), PublishError> {
        let path = self.path_for(storage_id);
        let bytes = serde_json::to_vec(document).map_err(|e| PublishError::Io {
            path: path.clone(),
            source: e.into(),
        })?;
        write_file(&path, &bytes)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PublishError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(PublishError::io(parent))?;
    }
    let part = path.with_extension("part");
    let mut file = fs::File::create(&part).map_err(PublishError::io(&part))?;
    file.write_all(bytes).map_err(PublishError::io(&part))?;
    file.sync_all().map_err(PublishError::io(&part))?;
    drop(file);
    fs::rename(&part, path).map_err(PublishError::io(path))
}
