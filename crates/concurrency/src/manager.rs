//! Transaction manager for the standalone host transaction
//!
//! Allocates context ids and tracks lifecycle metrics.
//!
//! # Memory Ordering
//!
//! The metric counters use Relaxed ordering: they are purely observational
//! and do not synchronize any other memory operations.

use crate::transaction::Transaction;
use scribe_core::ContextId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct TransactionMetricsInner {
    active: AtomicU64,
    started: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
}

impl TransactionMetricsInner {
    fn record_start(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.finish();
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.finish();
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        // Saturating decrement to prevent underflow
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }
}

/// Snapshot of transaction metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Transactions begun but not finished
    pub active: u64,
    /// Transactions begun
    pub started: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions aborted (explicitly, by failed vote, or by drop)
    pub aborted: u64,
}

/// Hands out transactions with unique context ids
pub struct TransactionManager {
    next_id: AtomicU64,
    metrics: Arc<TransactionMetricsInner>,
}

impl TransactionManager {
    /// Create a manager whose first transaction gets id 1
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            metrics: Arc::new(TransactionMetricsInner::default()),
        }
    }

    /// Begin a new transaction
    pub fn begin(&self) -> Transaction {
        let id = ContextId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.metrics.record_start();
        Transaction::with_metrics(id, Arc::clone(&self.metrics))
    }

    /// Current metrics snapshot
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            active: self.metrics.active.load(Ordering::Relaxed),
            started: self.metrics.started.load(Ordering::Relaxed),
            committed: self.metrics.committed.load(Ordering::Relaxed),
            aborted: self.metrics.aborted.load(Ordering::Relaxed),
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
