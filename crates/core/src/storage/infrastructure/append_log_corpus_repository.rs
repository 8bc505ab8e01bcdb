use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::shared::face_record::FaceRecord;
use crate::storage::domain::corpus_repository::CorpusRepository;
use crate::storage::domain::store_error::StoreError;
use crate::storage::infrastructure::json_file::{sync_parent_dir, write_bytes_atomic};

/// JSON-lines corpus: one record per line, appended and synced on commit.
///
/// Commit cost is proportional to the new record rather than the corpus, at
/// the price of a strict loader: any unparsable line (including a torn final
/// line) fails the load.
pub struct AppendLogCorpusRepository {
    path: PathBuf,
    handle: Option<File>,
}

impl AppendLogCorpusRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&mut self) -> Result<&mut File, StoreError> {
        let file = match self.handle.take() {
            Some(file) => file,
            None => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
                }
                let created = !self.path.exists();
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .map_err(StoreError::io(&self.path))?;
                if created {
                    sync_parent_dir(&self.path)?;
                }
                file
            }
        };
        Ok(self.handle.insert(file))
    }
}

impl CorpusRepository for AppendLogCorpusRepository {
    fn load(&self) -> Result<Vec<FaceRecord>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(StoreError::corrupt(self.location(), "log is not valid UTF-8"))
            }
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };

        if !text.is_empty() && !text.ends_with('\n') {
            return Err(StoreError::corrupt(
                self.location(),
                "final record is incomplete",
            ));
        }

        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    StoreError::corrupt(self.location(), format!("line {}: {e}", index + 1))
                })
            })
            .collect()
    }

    fn commit(&mut self, _records: &[FaceRecord], appended: &FaceRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(appended).map_err(|source| StoreError::Serialize {
            what: "face record",
            source,
        })?;
        line.push(b'\n');

        let path = self.path.clone();
        let file = self.handle()?;
        let previous_len = file.metadata().map_err(StoreError::io(&path))?.len();

        let written = file.write_all(&line).and_then(|_| file.sync_data());
        if let Err(e) = written {
            // Drop whatever part of the line made it to disk so the log stays parseable.
            if let Err(truncate) = file.set_len(previous_len) {
                log::error!(
                    "Failed to roll back partial append to {}: {truncate}",
                    path.display()
                );
            }
            self.handle = None;
            return Err(StoreError::io(path)(e));
        }
        Ok(())
    }

    fn rewrite(&mut self, records: &[FaceRecord]) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        for record in records {
            serde_json::to_writer(&mut bytes, record).map_err(|source| {
                StoreError::Serialize {
                    what: "face record",
                    source,
                }
            })?;
            bytes.push(b'\n');
        }
        // The open handle points at the file being replaced.
        self.handle = None;
        write_bytes_atomic(&self.path, &bytes)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::domain::signature_store::SignatureStore;
    use crate::testing::record;
    use tempfile::TempDir;

    #[test]
    fn test_missing_log_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let repo = AppendLogCorpusRepository::new(tmp.path().join("faces_data.jsonl"));
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn test_one_line_per_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("faces_data.jsonl");
        let store =
            SignatureStore::load(Box::new(AppendLogCorpusRepository::new(&path)), 2).unwrap();
        store.append(record(&[0.1, 0.2], "a")).unwrap();
        store.append(record(&[0.3, 0.4], "b")).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_reload_preserves_order_and_bits() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("faces_data.jsonl");
        let originals = vec![
            record(&[0.1, 1.0 / 7.0], "a"),
            record(&[-2.5e-8, 9.75], "b"),
            record(&[3.0, 1.0 / 3.0], "c"),
        ];
        {
            let store =
                SignatureStore::load(Box::new(AppendLogCorpusRepository::new(&path)), 2).unwrap();
            for r in &originals {
                store.append(r.clone()).unwrap();
            }
        }

        let reloaded = AppendLogCorpusRepository::new(&path).load().unwrap();
        let ids: Vec<&str> = reloaded.iter().map(|r| r.storage_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        for (got, want) in reloaded.iter().zip(&originals) {
            for (g, w) in got.signature.as_slice().iter().zip(want.signature.as_slice()) {
                assert_eq!(g.to_bits(), w.to_bits());
            }
        }
    }

    #[test]
    fn test_torn_final_line_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("faces_data.jsonl");
        let line = serde_json::to_string(&record(&[0.1], "a")).unwrap();
        fs::write(&path, format!("{line}\n{{\"signature\":[0.2")).unwrap();
        let err = AppendLogCorpusRepository::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::CorruptStore { .. }));
    }

    #[test]
    fn test_malformed_middle_line_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("faces_data.jsonl");
        let line = serde_json::to_string(&record(&[0.1], "a")).unwrap();
        fs::write(&path, format!("{line}\nnot json\n{line}\n")).unwrap();
        let err = AppendLogCorpusRepository::new(&path).load().unwrap_err();
        match err {
            StoreError::CorruptStore { reason, .. } => assert!(reason.starts_with("line 2")),
            other => panic!("expected CorruptStore, got {other:?}"),
        }
    }

    #[test]
    fn test_lines_without_storage_ids_are_upgraded_in_place() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("faces_data.jsonl");
        fs::write(
            &path,
            "{\"signature\":[0.1],\"timestamp\":\"t\",\"filename\":\"face_t.jpg\"}\n",
        )
        .unwrap();

        let store =
            SignatureStore::load(Box::new(AppendLogCorpusRepository::new(&path)), 1).unwrap();
        let id = store.records()[0].storage_id.clone();
        assert!(!id.is_empty());
        store.append(record(&[0.9], "b")).unwrap();

        let reloaded = AppendLogCorpusRepository::new(&path).load().unwrap();
        let ids: Vec<&str> = reloaded.iter().map(|r| r.storage_id.as_str()).collect();
        assert_eq!(ids, vec![id.as_str(), "b"]);
    }

    #[test]
    fn test_first_commit_creates_log_in_new_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("faces_data.jsonl");
        let mut repo = AppendLogCorpusRepository::new(&path);
        let r = record(&[0.1], "a");
        repo.commit(std::slice::from_ref(&r), &r).unwrap();
        assert_eq!(repo.load().unwrap().len(), 1);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("faces_data.jsonl");
        let line = serde_json::to_string(&record(&[0.1], "a")).unwrap();
        fs::write(&path, format!("{line}\n\n")).unwrap();
        assert_eq!(AppendLogCorpusRepository::new(&path).load().unwrap().len(), 1);
    }
}
