use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Process-wide submission counters, updated lock-free by the coordinator.
pub struct SubmissionStats {
    started: Instant,
    registered: AtomicU64,
    duplicates: AtomicU64,
    no_face: AtomicU64,
    publish_pending: AtomicU64,
    storage_failures: AtomicU64,
    encode_failures: AtomicU64,
}

/// Point-in-time copy of [`SubmissionStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub registered: u64,
    pub duplicates: u64,
    pub no_face: u64,
    pub publish_pending: u64,
    pub storage_failures: u64,
    pub encode_failures: u64,
    pub uptime_secs: u64,
}

impl StatsSnapshot {
    pub fn submissions(&self) -> u64 {
        self.registered + self.duplicates + self.no_face + self.storage_failures + self.encode_failures
    }
}

impl Default for SubmissionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            registered: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            no_face: AtomicU64::new(0),
            publish_pending: AtomicU64::new(0),
            storage_failures: AtomicU64::new(0),
            encode_failures: AtomicU64::new(0),
        }
    }

    pub fn record_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_face(&self) {
        self.no_face.fetch_add(1, Ordering::Relaxed);
    }

    /// A registration whose publish was deferred. Counted in addition to
    /// `registered`.
    pub fn record_publish_pending(&self) {
        self.publish_pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            no_face: self.no_face.load(Ordering::Relaxed),
            publish_pending: self.publish_pending.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }

    /// Returns the formatted summary string, or `None` if nothing was submitted.
    pub fn summary_string(&self) -> Option<String> {
        let s = self.snapshot();
        let total = s.submissions();
        if total == 0 {
            return None;
        }

        let pct = |n: u64| n as f64 / total as f64 * 100.0;
        let lines = [
            format!("Submission summary ({total} submissions, {}s uptime):", s.uptime_secs),
            format!("  registered      : {:6}  ({:4.1}%)", s.registered, pct(s.registered)),
            format!("  duplicates      : {:6}  ({:4.1}%)", s.duplicates, pct(s.duplicates)),
            format!("  no face         : {:6}  ({:4.1}%)", s.no_face, pct(s.no_face)),
            format!("  encode failures : {:6}", s.encode_failures),
            format!("  storage failures: {:6}", s.storage_failures),
            format!("  publish pending : {:6}", s.publish_pending),
        ];
        Some(lines.join("\n"))
    }
}
