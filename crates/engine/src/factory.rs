//! Producer-facing operation factory
//!
//! `OperationFactory` turns "this object was added / modified / removed"
//! into an `OperationRecord` and hands it to an `OperationSink`:
//!
//! - `BufferedSink`: the transaction's buffer, enqueued on commit (normal path)
//! - `SynchronousSink`: applied and flushed on a supplied connection right
//!   away, skipping buffer and queue (deterministic test path)
//!
//! Identifier resolution happens here, in the producer's call stack, so a
//! missing identifier fails the caller immediately.

use crate::processor::OperationProcessor;
use crate::registry::Registry;
use parking_lot::Mutex;
use scribe_concurrency::{BufferRegistry, TransactionHandle};
use scribe_core::{
    DocumentId, IndexConnection, Indexable, OperationKind, OperationRecord, ResolverTag,
    ScribeError, ScribeResult,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Object lifecycle notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Object was created
    Added,
    /// Object changed
    Modified,
    /// Object was deleted
    Removed,
}

impl LifecycleEvent {
    /// Operation kind recorded for this event
    pub fn operation_kind(self) -> OperationKind {
        match self {
            LifecycleEvent::Added => OperationKind::Add,
            LifecycleEvent::Modified => OperationKind::Modify,
            LifecycleEvent::Removed => OperationKind::Delete,
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination of records produced by an `OperationFactory`
pub trait OperationSink: Send + Sync {
    /// Route `record` on behalf of the transaction `txn`
    fn submit(&self, txn: &mut dyn TransactionHandle, record: OperationRecord) -> ScribeResult<()>;
}

/// Buffers records in the transaction's context
#[derive(Debug, Clone)]
pub struct BufferedSink {
    buffers: Arc<BufferRegistry>,
}

impl BufferedSink {
    /// Sink recording into `buffers`
    pub fn new(buffers: Arc<BufferRegistry>) -> Self {
        Self { buffers }
    }
}

impl OperationSink for BufferedSink {
    fn submit(&self, txn: &mut dyn TransactionHandle, record: OperationRecord) -> ScribeResult<()> {
        self.buffers.record(txn, record).map(|_| ())
    }
}

/// Applies each record on its own connection and flushes immediately
///
/// The transaction is ignored: the write is visible whether or not it
/// commits. Processing errors surface to the caller.
pub struct SynchronousSink {
    processor: Arc<OperationProcessor>,
    connection: Mutex<Box<dyn IndexConnection>>,
}

impl SynchronousSink {
    /// Sink writing through `connection`
    pub fn new(processor: Arc<OperationProcessor>, connection: Box<dyn IndexConnection>) -> Self {
        Self {
            processor,
            connection: Mutex::new(connection),
        }
    }
}

impl OperationSink for SynchronousSink {
    fn submit(&self, _txn: &mut dyn TransactionHandle, record: OperationRecord) -> ScribeResult<()> {
        let mut connection = self.connection.lock();
        info!(target: "scribe::worker", document_id = %record.document_id(), kind = %record.kind, "Processing synchronously");
        self.processor.process(&record, connection.as_mut())?;
        connection.flush()?;
        info!(target: "scribe::worker", "Flushed index");
        Ok(())
    }
}

impl std::fmt::Debug for SynchronousSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynchronousSink").finish_non_exhaustive()
    }
}

// ============================================================================
// OperationFactory
// ============================================================================

/// Creates operation records for objects owned by one resolver
#[derive(Clone)]
pub struct OperationFactory {
    resolver_tag: ResolverTag,
    registry: Arc<Registry>,
    sink: Arc<dyn OperationSink>,
}

impl OperationFactory {
    /// Factory for objects of the default resolver
    pub fn new(registry: Arc<Registry>, sink: Arc<dyn OperationSink>) -> Self {
        Self {
            resolver_tag: ResolverTag::default_resolver(),
            registry,
            sink,
        }
    }

    /// Same factory bound to the resolver registered under `tag`
    pub fn with_resolver(mut self, tag: ResolverTag) -> Self {
        self.resolver_tag = tag;
        self
    }

    /// Resolver tag stamped on every record
    pub fn resolver_tag(&self) -> &ResolverTag {
        &self.resolver_tag
    }

    /// Record that `object` was created
    pub fn add(&self, txn: &mut dyn TransactionHandle, object: &dyn Indexable) -> ScribeResult<()> {
        self.store(txn, object, OperationKind::Add)
    }

    /// Record that `object` changed
    pub fn modify(&self, txn: &mut dyn TransactionHandle, object: &dyn Indexable) -> ScribeResult<()> {
        self.store(txn, object, OperationKind::Modify)
    }

    /// Record that `object` was deleted
    pub fn remove(&self, txn: &mut dyn TransactionHandle, object: &dyn Indexable) -> ScribeResult<()> {
        self.store(txn, object, OperationKind::Delete)
    }

    /// Record the operation matching a lifecycle event
    pub fn notify(
        &self,
        txn: &mut dyn TransactionHandle,
        object: &dyn Indexable,
        event: LifecycleEvent,
    ) -> ScribeResult<()> {
        self.store(txn, object, event.operation_kind())
    }

    fn store(
        &self,
        txn: &mut dyn TransactionHandle,
        object: &dyn Indexable,
        kind: OperationKind,
    ) -> ScribeResult<()> {
        let id = self.identify(object)?;
        let record = OperationRecord::new(id, self.resolver_tag.clone(), kind);
        debug!(target: "scribe::buffer", context = %txn.context_id(), %record, "Recording operation");
        self.sink.submit(txn, record)
    }

    fn identify(&self, object: &dyn Indexable) -> ScribeResult<DocumentId> {
        let resolver = self.registry.resolver(&self.resolver_tag)?;
        let id = resolver
            .id(object)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ScribeError::identifier_not_found(format!("{:?}", object)))?;
        DocumentId::new(id)
    }
}

impl std::fmt::Debug for OperationFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationFactory")
            .field("resolver_tag", &self.resolver_tag)
            .finish_non_exhaustive()
    }
}
