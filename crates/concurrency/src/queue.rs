//! Process-wide hand-off queue between producers and the index worker
//!
//! Unbounded FIFO of committed operation records. Many producer threads
//! push (never blocking beyond a short critical section); exactly one
//! consumer pops with a bounded wait. No deduplication happens here:
//! records were already merged per transaction.

use parking_lot::{Condvar, Mutex};
use scribe_core::OperationRecord;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct QueueState {
    entries: VecDeque<OperationRecord>,
    /// Bumped by `interrupt` so a blocked consumer returns early
    interrupts: u64,
}

/// Concurrent FIFO of records ready to be applied
///
/// Constructed explicitly and shared via `Arc`; tests build their own.
pub struct IndexQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
    total_enqueued: AtomicU64,
}

impl IndexQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                entries: VecDeque::new(),
                interrupts: 0,
            }),
            ready: Condvar::new(),
            total_enqueued: AtomicU64::new(0),
        }
    }

    /// Append one record
    pub fn push(&self, record: OperationRecord) {
        {
            let mut state = self.state.lock();
            state.entries.push_back(record);
        }
        self.total_enqueued.fetch_add(1, Ordering::Relaxed);
        self.ready.notify_one();
    }

    /// Append many records under a single lock acquisition
    ///
    /// Returns the number of records appended.
    pub fn push_all(&self, records: impl IntoIterator<Item = OperationRecord>) -> usize {
        let count = {
            let mut state = self.state.lock();
            let before = state.entries.len();
            state.entries.extend(records);
            state.entries.len() - before
        };
        if count > 0 {
            self.total_enqueued
                .fetch_add(count as u64, Ordering::Relaxed);
            self.ready.notify_one();
        }
        count
    }

    /// Take the oldest record, waiting up to `timeout` for one to arrive
    ///
    /// Returns `None` on timeout or when `interrupt` is called while waiting.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<OperationRecord> {
        let epoch = self.interrupt_epoch();
        self.pop_timeout_since(epoch, timeout)
    }

    /// Current value of the interrupt counter
    ///
    /// A consumer that reads the epoch before checking its own stop flag and
    /// then calls `pop_timeout_since` cannot miss an interrupt issued in
    /// between.
    pub fn interrupt_epoch(&self) -> u64 {
        self.state.lock().interrupts
    }

    /// Like `pop_timeout`, but returns `None` as soon as the interrupt
    /// counter differs from `epoch`
    pub fn pop_timeout_since(&self, epoch: u64, timeout: Duration) -> Option<OperationRecord> {
        // A timeout too large to represent waits until a push or interrupt.
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        loop {
            if let Some(record) = state.entries.pop_front() {
                return Some(record);
            }
            if state.interrupts != epoch {
                return None;
            }
            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out() {
                        return state.entries.pop_front();
                    }
                }
                None => self.ready.wait(&mut state),
            }
        }
    }

    /// Take the oldest record without waiting
    pub fn try_pop(&self) -> Option<OperationRecord> {
        self.state.lock().entries.pop_front()
    }

    /// Wake any consumer blocked in `pop_timeout`
    pub fn interrupt(&self) {
        // Lock before notifying so a consumer between its check and wait()
        // either sees the bumped counter or receives the notification.
        let mut state = self.state.lock();
        state.interrupts = state.interrupts.wrapping_add(1);
        self.ready.notify_all();
    }

    /// Records currently waiting
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether no records are waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records appended since creation
    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.load(Ordering::Relaxed)
    }
}

impl Default for IndexQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IndexQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexQueue")
            .field("len", &self.len())
            .field("total_enqueued", &self.total_enqueued())
            .finish()
    }
}
