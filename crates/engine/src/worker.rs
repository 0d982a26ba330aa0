//! Single-consumer index worker
//!
//! `QueueWorker` owns one background thread (`scribe-indexer`) bound to
//! one `IndexConnection`. The thread drains the `IndexQueue`, applies each
//! record through the `OperationProcessor`, and batches connection flushes:
//!
//! - every `flush_threshold` successfully applied records
//! - when the queue stays empty for `poll_timeout` and something is pending
//! - once more when the worker stops
//!
//! A record that fails is logged and dropped; the loop never exits
//! because of one record. Panics raised by collaborators are caught and
//! treated as failures of the record being applied.

use crate::processor::OperationProcessor;
use parking_lot::Mutex;
use scribe_concurrency::IndexQueue;
use scribe_core::{IndexConnection, OperationRecord, ScribeError, ScribeResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Callback run on the worker thread after every successful flush
pub type FlushHook = Arc<dyn Fn() + Send + Sync>;

/// Tunables of the worker loop
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    /// Applied records between two flushes
    pub flush_threshold: usize,
    /// Bounded wait on an empty queue
    pub poll_timeout: Duration,
    /// Push an unresolvable Add/Modify back onto the queue once
    pub requeue_unresolved: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            flush_threshold: 20,
            poll_timeout: Duration::from_secs(60),
            requeue_unresolved: false,
        }
    }
}

/// Worker metrics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Records applied successfully
    pub processed: u64,
    /// Records dropped after a processing failure
    pub failed: u64,
    /// Records pushed back once after a resolution failure
    pub requeued: u64,
    /// Successful connection flushes
    pub flushes: u64,
    /// Connection flushes that returned an error
    pub flush_failures: u64,
    /// Applied records not yet flushed
    pub pending: usize,
}

#[derive(Default)]
struct WorkerShared {
    running: AtomicBool,
    processed: AtomicU64,
    failed: AtomicU64,
    requeued: AtomicU64,
    flushes: AtomicU64,
    flush_failures: AtomicU64,
    pending: AtomicUsize,
}

/// Start/stop handle of the index worker thread
///
/// States: stopped (no thread) and running (one thread). Dropping a
/// running worker stops it.
pub struct QueueWorker {
    queue: Arc<IndexQueue>,
    processor: Arc<OperationProcessor>,
    settings: WorkerSettings,
    flush_hook: Option<FlushHook>,
    shared: Arc<WorkerShared>,
    handle: Mutex<Option<JoinHandle<Box<dyn IndexConnection>>>>,
}

impl QueueWorker {
    /// Stopped worker draining `queue`
    pub fn new(
        queue: Arc<IndexQueue>,
        processor: Arc<OperationProcessor>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            queue,
            processor,
            settings,
            flush_hook: None,
            shared: Arc::new(WorkerShared::default()),
            handle: Mutex::new(None),
        }
    }

    /// Run `hook` on the worker thread after every successful flush
    pub fn with_flush_hook(mut self, hook: FlushHook) -> Self {
        self.flush_hook = Some(hook);
        self
    }

    /// Spawn the worker thread bound to `connection`
    ///
    /// # Errors
    /// `WorkerAlreadyRunning` if a thread is already running, unless
    /// `silent` is set, in which case the call is a no-op and `connection`
    /// is dropped. `Io` if the thread cannot be spawned.
    pub fn start(&self, connection: Box<dyn IndexConnection>, silent: bool) -> ScribeResult<()> {
        let mut handle = self.handle.lock();
        if handle.as_ref().map_or(false, |h| h.is_finished()) {
            // The thread exited on its own; its connection is lost.
            if let Some(dead) = handle.take() {
                let _ = dead.join();
            }
            warn!(target: "scribe::worker", "Reaped exited index worker");
        }
        if handle.is_some() {
            if silent {
                return Ok(());
            }
            return Err(ScribeError::WorkerAlreadyRunning);
        }

        self.shared.running.store(true, Ordering::Release);
        let worker = WorkerLoop {
            queue: Arc::clone(&self.queue),
            processor: Arc::clone(&self.processor),
            settings: self.settings,
            flush_hook: self.flush_hook.clone(),
            shared: Arc::clone(&self.shared),
            connection,
            pending: 0,
        };
        let spawned = std::thread::Builder::new()
            .name("scribe-indexer".to_string())
            .spawn(move || worker.run());

        match spawned {
            Ok(h) => {
                *handle = Some(h);
                info!(target: "scribe::worker", "Index worker started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Signal the worker to exit and wait for it
    ///
    /// Returns the connection the worker was bound to, or `None` when the
    /// worker was not running (or its thread panicked).
    pub fn stop(&self) -> Option<Box<dyn IndexConnection>> {
        // Held across the join so a concurrent start() cannot race the exit.
        let mut guard = self.handle.lock();
        let handle = guard.take()?;

        info!(target: "scribe::worker", "Stopping index worker");
        self.shared.running.store(false, Ordering::Release);
        self.queue.interrupt();

        match handle.join() {
            Ok(connection) => {
                info!(target: "scribe::worker", "Index worker stopped");
                Some(connection)
            }
            Err(_) => {
                error!(target: "scribe::worker", "Index worker thread panicked");
                None
            }
        }
    }

    /// Whether a worker thread is running
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map_or(false, |h| !h.is_finished())
    }

    /// Worker loop settings
    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Current statistics
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            processed: self.shared.processed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            requeued: self.shared.requeued.load(Ordering::Relaxed),
            flushes: self.shared.flushes.load(Ordering::Acquire),
            flush_failures: self.shared.flush_failures.load(Ordering::Relaxed),
            pending: self.shared.pending.load(Ordering::Relaxed),
        }
    }
}

impl Drop for QueueWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for QueueWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueWorker")
            .field("running", &self.is_running())
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish()
    }
}

// ============================================================================
// Worker thread
// ============================================================================

struct WorkerLoop {
    queue: Arc<IndexQueue>,
    processor: Arc<OperationProcessor>,
    settings: WorkerSettings,
    flush_hook: Option<FlushHook>,
    shared: Arc<WorkerShared>,
    connection: Box<dyn IndexConnection>,
    pending: usize,
}

impl WorkerLoop {
    fn run(mut self) -> Box<dyn IndexConnection> {
        loop {
            // Read the epoch before the flag so a stop() in between is seen.
            let epoch = self.queue.interrupt_epoch();
            if !self.shared.running.load(Ordering::Acquire) {
                break;
            }
            match self.queue.pop_timeout_since(epoch, self.settings.poll_timeout) {
                None => {
                    if self.pending > 0 {
                        debug!(target: "scribe::worker", pending = self.pending, "Idle flush");
                        self.flush();
                    }
                }
                Some(record) => {
                    self.apply(record);
                    if self.pending >= self.settings.flush_threshold {
                        debug!(target: "scribe::worker", pending = self.pending, "Threshold flush");
                        self.flush();
                    }
                }
            }
        }

        if self.pending > 0 {
            self.flush();
        }
        self.connection
    }

    fn apply(&mut self, record: OperationRecord) {
        debug!(
            target: "scribe::worker",
            document_id = %record.document_id(),
            kind = %record.kind,
            "Processing operation"
        );
        let processor = &self.processor;
        let connection = self.connection.as_mut();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&record, connection)));
        match outcome {
            Ok(Ok(())) => {
                self.pending += 1;
                self.shared.pending.store(self.pending, Ordering::Relaxed);
                self.shared.processed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => self.fail(record, e),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.fail(record, ScribeError::internal(format!("panicked: {}", message)));
            }
        }
    }

    fn fail(&self, record: OperationRecord, e: ScribeError) {
        if self.settings.requeue_unresolved
            && e.is_resolution_failure()
            && !record.requeued
            && record.kind.needs_resolution()
        {
            warn!(
                target: "scribe::worker",
                document_id = %record.document_id(),
                kind = %record.kind,
                "Could not resolve document, requeueing once"
            );
            let mut retry = record;
            retry.requeued = true;
            self.queue.push(retry);
            self.shared.requeued.fetch_add(1, Ordering::Relaxed);
            return;
        }

        error!(
            target: "scribe::worker",
            document_id = %record.document_id(),
            kind = %record.kind,
            resolver = %record.resolver_tag,
            error = %e,
            "Error during index operation"
        );
        self.shared.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn flush(&mut self) {
        let connection = self.connection.as_mut();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| connection.flush()))
            .unwrap_or_else(|payload| {
                Err(ScribeError::internal(format!(
                    "flush panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
        match outcome {
            Ok(()) => {
                info!(target: "scribe::worker", pending = self.pending, "Flushed index");
                self.pending = 0;
                self.shared.pending.store(0, Ordering::Relaxed);
                if let Some(hook) = &self.flush_hook {
                    hook();
                }
                self.shared.flushes.fetch_add(1, Ordering::Release);
            }
            Err(e) => {
                // Pending count is kept so the next trigger retries the flush.
                error!(target: "scribe::worker", pending = self.pending, error = %e, "Index flush failed");
                self.shared.flush_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}
