//! Whole-file JSON persistence with crash-safe replacement.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::domain::store_error::StoreError;

/// Reads and parses `path`. A missing file is `Ok(None)`; an empty or
/// malformed one is `CorruptStore`.
pub fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path)(e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(StoreError::corrupt(path.display().to_string(), "file is empty"));
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::corrupt(path.display().to_string(), e.to_string()))
}

/// Replaces `path` with `value` serialized as JSON.
pub fn write_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    what: &'static str,
) -> Result<(), StoreError> {
    let bytes =
        serde_json::to_vec(value).map_err(|source| StoreError::Serialize { what, source })?;
    write_bytes_atomic(path, &bytes)
}

/// Replaces `path` with `bytes`.
///
/// Writes a sibling `.part` file, syncs it, then renames over the target so
/// a reader never observes a partially written file. The rename itself is
/// made durable by syncing the parent directory.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
    }

    let part = part_path(path);
    let mut file = fs::File::create(&part).map_err(StoreError::io(&part))?;
    file.write_all(bytes).map_err(StoreError::io(&part))?;
    file.sync_all().map_err(StoreError::io(&part))?;
    drop(file);

    fs::rename(&part, path).map_err(StoreError::io(path))?;
    sync_parent_dir(path)
}

/// Flushes the directory entry of `path`, so a rename or create that has
/// returned survives power loss.
pub fn sync_parent_dir(path: &Path) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    sync_dir(parent)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(StoreError::io(dir))
}

// Directories cannot be opened as files here; renames are durable once
// the call returns.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}

pub fn is_part_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "part")
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let value: Option<Vec<u32>> = read_optional(&tmp.path().join("absent.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("values.json");
        write_atomic(&path, &vec![1u32, 2, 3], "values").unwrap();
        let value: Option<Vec<u32>> = read_optional(&path).unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
        assert!(!tmp.path().join("nested").join("values.json.part").exists());
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("values.json");
        write_atomic(&path, &vec![1u32], "values").unwrap();
        write_atomic(&path, &vec![7u32, 8], "values").unwrap();
        let value: Option<Vec<u32>> = read_optional(&path).unwrap();
        assert_eq!(value, Some(vec![7, 8]));
    }

    #[test]
    fn test_sync_parent_dir_of_written_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("values.json");
        write_atomic(&path, &vec![1u32], "values").unwrap();
        sync_parent_dir(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_parent_dir_reports_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gone").join("values.json");
        let err = sync_parent_dir(&path).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_part_file_detection() {
        assert!(is_part_file(Path::new("pending/abc.part")));
        assert!(!is_part_file(Path::new("pending/abc")));
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.json");
        fs::write(&path, "  \n").unwrap();
        let err = read_optional::<Vec<u32>>(&path).unwrap_err();
        assert!(matches!(err, StoreError::CorruptStore { .. }));
    }

    #[test]
    fn test_malformed_file_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "[1, 2,").unwrap();
        let err = read_optional::<Vec<u32>>(&path).unwrap_err();
        assert!(matches!(err, StoreError::CorruptStore { .. }));
    }
}
