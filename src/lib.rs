//! Scribe - transactional write-behind indexing
//!
//! Scribe keeps a full-text index eventually consistent with changes to
//! domain objects without putting index writes on the path of the
//! transaction that made the change.
//!
//! # Quick Start
//!
//! ```ignore
//! use scribe::{Pipeline, ScribeConfig};
//!
//! let pipeline = Pipeline::open("/var/lib/myapp")?;
//! pipeline.registry().register_default_resolver(resolver);
//! pipeline.start_worker(Box::new(pipeline.open_index_writer()?))?;
//!
//! let mut txn = pipeline.begin();
//! pipeline.factory().add(&mut txn, &page)?;
//! txn.commit()?; // the Add reaches the queue only now
//!
//! let search = pipeline.directory_search()?;
//! let hits = search.with_connection(|s| s.search("quarterly report", 10))?;
//! ```
//!
//! # Architecture
//!
//! - Producers record operations into a per-transaction buffer that
//!   merges them by document id.
//! - A commit coordinator moves the buffer into the process-wide queue
//!   when the transaction commits, and drops it on abort.
//! - One worker thread drains the queue, resolves and builds documents,
//!   applies them, and flushes in batches.
//! - Readers get per-thread search connections that reopen when stale.

pub use scribe_concurrency::{
    BufferRegistry, IndexQueue, MergeOutcome, Transaction, TransactionHandle, TransactionManager,
    TransactionParticipant, TransactionStatus,
};
pub use scribe_core::{
    Clock, ConnectionOpener, ContextId, Document, DocumentBuilder, DocumentId, Field,
    IndexConnection, Indexable, ManualClock, OperationKind, OperationRecord, Resolver,
    ResolverTag, ScribeError, ScribeResult, SearchConnection, SystemClock, Timestamp,
    RESOLVER_FIELD,
};
pub use scribe_engine::*;
pub use scribe_search::{DirectoryOpener, IndexDirectory, IndexWriter, SearchHit, Searcher};
