//! Hand-written stubs for the trait seams, shared by unit tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::encoding::domain::face_encoder::{EncodeError, FaceEncoder};
use crate::publishing::domain::artifact_publisher::ArtifactPublisher;
use crate::publishing::domain::artifact_store::{ArtifactStore, FaceDocument, RecordStore};
use crate::publishing::domain::publish_error::PublishError;
use crate::publishing::domain::upload_ledger::LedgerRepository;
use crate::shared::face_record::FaceRecord;
use crate::shared::signature::Signature;
use crate::storage::domain::corpus_repository::CorpusRepository;
use crate::storage::domain::store_error::StoreError;

pub fn signature(values: &[f64]) -> Signature {
    Signature::new(values.to_vec()).unwrap()
}

pub fn record(values: &[f64], storage_id: &str) -> FaceRecord {
    FaceRecord::new(
        signature(values),
        &format!("ts-{storage_id}"),
        storage_id.to_string(),
    )
}

/// 4x4 PNG filled with a single colour.
pub fn png_bytes_of(rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn png_bytes() -> Vec<u8> {
    png_bytes_of([255, 0, 0])
}

fn injected_failure(what: &str) -> StoreError {
    StoreError::Io {
        path: what.into(),
        source: std::io::Error::other("injected failure"),
    }
}

/// Encodes deterministically from the bytes themselves:
///
/// - `b"none"` has no face,
/// - comma-separated floats (`b"0.1,0.2"`) are the signature,
/// - a decodable image maps to its top-left pixel scaled to `[0, 1]`,
/// - anything else is a decode error.
pub struct StubEncoder {
    dimension: usize,
    calls: AtomicUsize,
}

impl StubEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaceEncoder for StubEncoder {
    fn encode(&self, image: &[u8]) -> Result<Option<Signature>, EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image == b"none" {
            return Ok(None);
        }
        if let Ok(text) = std::str::from_utf8(image) {
            let parsed: Result<Vec<f64>, _> = text.split(',').map(|v| v.trim().parse()).collect();
            if let Ok(values) = parsed {
                return Ok(Some(Signature::new(values)?));
            }
        }
        let img = image::load_from_memory(image)
            .map_err(|e| EncodeError::Decode(e.to_string()))?
            .to_rgb8();
        let px = img.get_pixel(0, 0);
        let values = px.0.iter().map(|&c| c as f64 / 255.0).collect();
        Ok(Some(Signature::new(values)?))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Default)]
struct CorpusInner {
    records: Vec<FaceRecord>,
    fail: bool,
}

#[derive(Clone, Default)]
pub struct MemoryCorpusRepository {
    inner: Arc<Mutex<CorpusInner>>,
}

impl MemoryCorpusRepository {
    pub fn with_records(records: Vec<FaceRecord>) -> Self {
        let repo = Self::default();
        repo.inner.lock().unwrap().records = records;
        repo
    }

    pub fn persisted(&self) -> Vec<FaceRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    pub fn fail_commits(&self, fail: bool) {
        self.inner.lock().unwrap().fail = fail;
    }
}

impl CorpusRepository for MemoryCorpusRepository {
    fn load(&self) -> Result<Vec<FaceRecord>, StoreError> {
        Ok(self.persisted())
    }

    fn commit(&mut self, records: &[FaceRecord], _appended: &FaceRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail {
            return Err(injected_failure("memory corpus"));
        }
        inner.records = records.to_vec();
        Ok(())
    }

    fn rewrite(&mut self, records: &[FaceRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail {
            return Err(injected_failure("memory corpus"));
        }
        inner.records = records.to_vec();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[derive(Default)]
struct LedgerInner {
    ids: Vec<String>,
    fail: bool,
    commits: usize,
}

#[derive(Clone, Default)]
pub struct MemoryLedgerRepository {
    inner: Arc<Mutex<LedgerInner>>,
}

impl MemoryLedgerRepository {
    pub fn with_ids(ids: Vec<String>) -> Self {
        let repo = Self::default();
        repo.inner.lock().unwrap().ids = ids;
        repo
    }

    pub fn persisted(&self) -> Vec<String> {
        self.inner.lock().unwrap().ids.clone()
    }

    pub fn fail_commits(&self, fail: bool) {
        self.inner.lock().unwrap().fail = fail;
    }

    pub fn commit_count(&self) -> usize {
        self.inner.lock().unwrap().commits
    }
}

impl LedgerRepository for MemoryLedgerRepository {
    fn load(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.persisted())
    }

    fn commit(&mut self, ids: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail {
            return Err(injected_failure("memory ledger"));
        }
        inner.ids = ids.to_vec();
        inner.commits += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

fn unavailable(endpoint: &str) -> PublishError {
    PublishError::Rejected {
        endpoint: endpoint.to_string(),
        status: 503,
    }
}

/// Artifact store that keeps uploads in memory and can fail on demand.
#[derive(Clone, Default)]
pub struct MemoryArtifactStore {
    uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    failures: Arc<AtomicUsize>,
}

impl MemoryArtifactStore {
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    /// The next `n` uploads fail with a 503.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn upload(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String, PublishError> {
        if take_failure(&self.failures) {
            return Err(unavailable("mem://"));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), bytes.to_vec()));
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("mem://{key}")
    }
}

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    documents: Arc<Mutex<Vec<(String, FaceDocument)>>>,
    failures: Arc<AtomicUsize>,
}

impl MemoryRecordStore {
    pub fn documents(&self) -> Vec<(String, FaceDocument)> {
        self.documents.lock().unwrap().clone()
    }

    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, storage_id: &str, document: &FaceDocument) -> Result<(), PublishError> {
        if take_failure(&self.failures) {
            return Err(unavailable("mem://records"));
        }
        self.documents
            .lock()
            .unwrap()
            .push((storage_id.to_string(), document.clone()));
        Ok(())
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Publisher that fails its first `failures` calls with `error()`.
#[derive(Clone)]
pub struct FlakyPublisher {
    remaining: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<String>>>,
    error: fn() -> PublishError,
}

impl FlakyPublisher {
    pub fn failing(failures: usize, error: fn() -> PublishError) -> Self {
        Self {
            remaining: Arc::new(AtomicUsize::new(failures)),
            calls: Arc::new(Mutex::new(Vec::new())),
            error,
        }
    }

    pub fn succeeding() -> Self {
        Self::failing(0, || unavailable("flaky"))
    }

    pub fn always_failing() -> Self {
        Self::failing(usize::MAX, || unavailable("flaky"))
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn attempted_ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ArtifactPublisher for FlakyPublisher {
    fn publish(
        &self,
        storage_id: &str,
        _image: &[u8],
        _signature: &Signature,
        _timestamp: &str,
    ) -> Result<String, PublishError> {
        self.calls.lock().unwrap().push(storage_id.to_string());
        if take_failure(&self.remaining) {
            return Err((self.error)());
        }
        Ok(format!("mem://faces/{storage_id}"))
    }
}
