use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::storage::domain::store_error::StoreError;
use crate::storage::infrastructure::json_file::{is_part_file, write_bytes_atomic};

/// Raw image bytes of registrations whose publish has not yet succeeded,
/// one file per storage id.
pub struct PendingSpool {
    dir: PathBuf,
}

impl PendingSpool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stash(&self, storage_id: &str, image: &[u8]) -> Result<(), StoreError> {
        write_bytes_atomic(&self.dir.join(storage_id), image)
    }

    pub fn load(&self, storage_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.dir.join(storage_id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path)(e)),
        }
    }

    /// Removing an id that was never stashed is not an error.
    pub fn remove(&self, storage_id: &str) -> Result<(), StoreError> {
        let path = self.dir.join(storage_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path)(e)),
        }
    }

    /// Stashed ids in lexical order. Interrupted writes are ignored.
    pub fn ids(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir)(e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(StoreError::io(&self.dir))?.path();
            if !path.is_file() || is_part_file(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stash_load_remove() {
        let tmp = TempDir::new().unwrap();
        let spool = PendingSpool::new(tmp.path().join("pending"));
        spool.stash("abc", b"image").unwrap();
        assert_eq!(spool.load("abc").unwrap().as_deref(), Some(&b"image"[..]));

        spool.remove("abc").unwrap();
        assert!(spool.load("abc").unwrap().is_none());
    }

    #[test]
    fn test_missing_entries_are_not_errors() {
        let tmp = TempDir::new().unwrap();
        let spool = PendingSpool::new(tmp.path().join("pending"));
        assert!(spool.load("nope").unwrap().is_none());
        spool.remove("nope").unwrap();
        assert!(spool.ids().unwrap().is_empty());
    }

    #[test]
    fn test_ids_skip_partial_writes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("pending");
        let spool = PendingSpool::new(&dir);
        spool.stash("b", b"2").unwrap();
        spool.stash("a", b"1").unwrap();
        fs::write(dir.join("c.part"), b"partial").unwrap();
        assert_eq!(spool.ids().unwrap(), vec!["a", "b"]);
    }
}
