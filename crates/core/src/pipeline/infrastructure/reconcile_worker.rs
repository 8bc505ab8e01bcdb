use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Sender};

use crate::pipeline::reconcile_uploads_use_case::ReconcileUploadsUseCase;

/// Runs [`ReconcileUploadsUseCase`] on a background thread: once at start,
/// then every `interval` until stopped.
pub struct ReconcileWorker {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ReconcileWorker {
    pub fn spawn(use_case: ReconcileUploadsUseCase, interval: Duration) -> io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let ticker = crossbeam_channel::tick(interval);

        let handle = thread::Builder::new()
            .name("reconcile-uploads".into())
            .spawn(move || {
                run_pass(&use_case);
                loop {
                    select! {
                        recv(ticker) -> _ => run_pass(&use_case),
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                log::debug!("Reconcile worker stopped");
            })?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Signals the thread and waits for an in-flight pass to finish.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the select.
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Reconcile worker panicked");
            }
        }
    }
}

impl Drop for ReconcileWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_pass(use_case: &ReconcileUploadsUseCase) {
    match use_case.execute() {
        Ok(report) if report.scanned > 0 => log::info!(
            "Reconciled uploads: {} scanned, {} published, {} missing, {} failed",
            report.scanned,
            report.published,
            report.missing_artifact,
            report.failed
        ),
        Ok(_) => log::debug!("Reconcile pass found nothing to publish"),
        Err(e) => log::error!("Reconcile pass aborted: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publishing::domain::upload_ledger::UploadLedger;
    use crate::publishing::infrastructure::pending_spool::PendingSpool;
    use crate::storage::domain::signature_store::SignatureStore;
    use crate::testing::{record, FlakyPublisher, MemoryCorpusRepository, MemoryLedgerRepository};
    use std::sync::Arc;
    use std::time::Instant;
    use tempfile::TempDir;

    fn use_case(tmp: &TempDir, publisher: FlakyPublisher) -> ReconcileUploadsUseCase {
        let store =
            Arc::new(SignatureStore::load(Box::new(MemoryCorpusRepository::default()), 1).unwrap());
        store.append(record(&[0.0], "a")).unwrap();
        let spool = PendingSpool::new(tmp.path().join("pending"));
        spool.stash("a", b"raw").unwrap();
        let ledger =
            Arc::new(UploadLedger::load(Box::new(MemoryLedgerRepository::default())).unwrap());
        ReconcileUploadsUseCase::new(store, ledger, Arc::new(publisher), spool)
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_runs_immediately_on_spawn() {
        let tmp = TempDir::new().unwrap();
        let publisher = FlakyPublisher::succeeding();
        let mut worker =
            ReconcileWorker::spawn(use_case(&tmp, publisher.clone()), Duration::from_secs(3600))
                .unwrap();
        assert!(wait_for(|| publisher.calls() >= 1));
        worker.stop();
    }

    #[test]
    fn test_retries_on_each_tick() {
        let tmp = TempDir::new().unwrap();
        // The ledger is never marked by this publisher, so every pass retries.
        let publisher = FlakyPublisher::always_failing();
        let mut worker =
            ReconcileWorker::spawn(use_case(&tmp, publisher.clone()), Duration::from_millis(10))
                .unwrap();
        assert!(wait_for(|| publisher.calls() >= 3));
        worker.stop();
    }

    #[test]
    fn test_stop_is_prompt_and_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut worker = ReconcileWorker::spawn(
            use_case(&tmp, FlakyPublisher::succeeding()),
            Duration::from_secs(3600),
        )
        .unwrap();
        let started = Instant::now();
        worker.stop();
        worker.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
