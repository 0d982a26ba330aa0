//! Commit hook that makes buffer flush atomic with the ambient transaction
//!
//! `BufferRegistry` finds the buffer of the calling context by its
//! `ContextId` (explicit context passing, no thread-local lookup). The
//! first record a context buffers registers one `CommitCoordinator` with
//! that context's transaction. The coordinator votes yes, moves the
//! buffer into the queue when the transaction finishes, and drops it when
//! the transaction aborts.

use crate::buffer::{MergeOutcome, TransactionBuffer};
use crate::participant::{TransactionHandle, TransactionParticipant};
use crate::queue::IndexQueue;
use dashmap::DashMap;
use scribe_core::{ContextId, OperationRecord, ScribeResult};
use std::sync::Arc;
use tracing::{debug, trace};

/// Buffers of all in-flight transaction contexts
///
/// Each context only ever touches its own entry.
pub struct BufferRegistry {
    buffers: DashMap<ContextId, TransactionBuffer>,
    queue: Arc<IndexQueue>,
}

impl BufferRegistry {
    /// Create a registry that flushes into `queue`
    pub fn new(queue: Arc<IndexQueue>) -> Self {
        Self {
            buffers: DashMap::new(),
            queue,
        }
    }

    /// Queue that committed buffers are flushed into
    pub fn queue(&self) -> &Arc<IndexQueue> {
        &self.queue
    }

    /// Buffer `op` in the transaction's context
    ///
    /// Registers a `CommitCoordinator` with `txn` the first time the
    /// context's buffer is used.
    ///
    /// # Errors
    /// Propagates the join failure if the transaction is no longer active;
    /// the context's buffer is discarded in that case.
    pub fn record(
        self: &Arc<Self>,
        txn: &mut dyn TransactionHandle,
        op: OperationRecord,
    ) -> ScribeResult<MergeOutcome> {
        let context = txn.context_id();
        trace!(target: "scribe::buffer", %context, record = %op, "Buffering operation");

        // Shard lock must be released before calling into the transaction.
        let (outcome, needs_registration) = {
            let mut buffer = self.buffers.entry(context).or_default();
            let outcome = buffer.add(op);
            let needs_registration = !buffer.is_registered();
            if needs_registration {
                buffer.mark_registered();
            }
            (outcome, needs_registration)
        };

        if needs_registration {
            let coordinator = CommitCoordinator::new(context, Arc::clone(self));
            if let Err(e) = txn.join(Box::new(coordinator)) {
                self.buffers.remove(&context);
                return Err(e);
            }
            debug!(target: "scribe::buffer", %context, "Registered commit coordinator");
        }
        Ok(outcome)
    }

    /// Move the context's records into the queue and forget the buffer
    ///
    /// Returns the number of records enqueued.
    pub fn flush(&self, context: ContextId) -> usize {
        match self.buffers.remove(&context) {
            Some((_, mut buffer)) => {
                let count = buffer.flush(&self.queue);
                debug!(target: "scribe::buffer", %context, count, "Flushed buffer to queue");
                count
            }
            None => 0,
        }
    }

    /// Drop the context's records without enqueuing
    ///
    /// Returns the number of records dropped.
    pub fn discard(&self, context: ContextId) -> usize {
        match self.buffers.remove(&context) {
            Some((_, mut buffer)) => {
                let count = buffer.clear();
                debug!(target: "scribe::buffer", %context, count, "Discarded buffer");
                count
            }
            None => 0,
        }
    }

    /// Records currently buffered for `context`
    pub fn pending(&self, context: ContextId) -> usize {
        self.buffers.get(&context).map(|b| b.len()).unwrap_or(0)
    }

    /// Surviving record for `id` in `context`, if any
    pub fn buffered(
        &self,
        context: ContextId,
        id: &scribe_core::DocumentId,
    ) -> Option<OperationRecord> {
        self.buffers
            .get(&context)
            .and_then(|b| b.get(id).cloned())
    }

    /// Number of contexts with a live buffer
    pub fn active_contexts(&self) -> usize {
        self.buffers.len()
    }
}

impl std::fmt::Debug for BufferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferRegistry")
            .field("active_contexts", &self.buffers.len())
            .field("queue", &self.queue)
            .finish()
    }
}

/// Transaction participant owning the flush/discard of one buffer
///
/// Holds nothing but the context token and the registry; one instance per
/// transaction, never reused.
pub struct CommitCoordinator {
    context: ContextId,
    registry: Arc<BufferRegistry>,
}

impl CommitCoordinator {
    /// Coordinator for `context`'s buffer
    pub fn new(context: ContextId, registry: Arc<BufferRegistry>) -> Self {
        Self { context, registry }
    }
}

impl TransactionParticipant for CommitCoordinator {
    fn sort_key(&self) -> String {
        format!("scribe-buffer-{:020}", self.context.as_u64())
    }

    fn on_commit(&mut self) {
        self.registry.flush(self.context);
    }

    fn on_abort(&mut self) {
        self.registry.discard(self.context);
    }
}
