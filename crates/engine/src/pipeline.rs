//! Administrative facade wiring the pipeline together
//!
//! A `Pipeline` owns the process-wide pieces: the queue, the per-context
//! buffers, the collaborator registry, the worker, and the search hubs it
//! handed out. Nothing here is a hidden global; tests build as many
//! pipelines as they like.
//!
//! ```ignore
//! use scribe_engine::{Pipeline, ScribeConfig};
//!
//! let pipeline = Pipeline::builder().config(ScribeConfig::default()).build()?;
//! pipeline.registry().register_default_resolver(resolver);
//! pipeline.start_worker(Box::new(pipeline.open_index_writer()?))?;
//!
//! let mut txn = pipeline.begin();
//! pipeline.factory().add(&mut txn, &page)?;
//! txn.commit()?;
//! ```

use crate::config::{DispatchMode, ScribeConfig, CONFIG_FILE_NAME};
use crate::factory::{BufferedSink, OperationFactory, OperationSink, SynchronousSink};
use crate::hub::{ConnectionHub, IndexSearch, Invalidate};
use crate::processor::OperationProcessor;
use crate::registry::Registry;
use crate::worker::{FlushHook, QueueWorker, WorkerSettings, WorkerStats};
use parking_lot::Mutex;
use scribe_concurrency::{BufferRegistry, IndexQueue, Transaction, TransactionManager};
use scribe_core::{ConnectionOpener, IndexConnection, ResolverTag, ScribeError, ScribeResult};
use scribe_search::{DirectoryOpener, IndexDirectory, IndexWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::info;

/// Hubs handed out by a pipeline; a hub is dropped with its last `IndexSearch`
type HubList = Arc<Mutex<Vec<Weak<dyn Invalidate>>>>;

/// Invalidate every hub still alive and forget the dropped ones
fn invalidate_all(hubs: &HubList) {
    hubs.lock().retain(|hub| match hub.upgrade() {
        Some(hub) => {
            hub.invalidate();
            true
        }
        None => false,
    });
}

// ============================================================================
// PipelineBuilder
// ============================================================================

/// Builder for a `Pipeline`
///
/// Dispatch mode comes from the config. `"synchronous"` requires a
/// connection via `synchronous_connection`; supplying one in
/// `"buffered"` mode is rejected too.
pub struct PipelineBuilder {
    config: ScribeConfig,
    data_dir: Option<PathBuf>,
    registry: Option<Arc<Registry>>,
    queue: Option<Arc<IndexQueue>>,
    sync_connection: Option<Box<dyn IndexConnection>>,
}

impl PipelineBuilder {
    /// Builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ScribeConfig::default(),
            data_dir: None,
            registry: None,
            queue: None,
            sync_connection: None,
        }
    }

    /// Load `scribe.toml` from `data_dir`, writing the default first if it
    /// does not exist. Relative index paths resolve against `data_dir`.
    pub fn from_data_dir(data_dir: impl Into<PathBuf>) -> ScribeResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let path = data_dir.join(CONFIG_FILE_NAME);
        ScribeConfig::write_default_if_missing(&path)?;
        let config = ScribeConfig::from_file(&path)?;
        Ok(Self {
            config,
            data_dir: Some(data_dir),
            ..Self::new()
        })
    }

    /// Use `config`
    pub fn config(mut self, config: ScribeConfig) -> Self {
        self.config = config;
        self
    }

    /// Directory relative index paths resolve against
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Share an existing collaborator registry
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Share an existing queue
    pub fn queue(mut self, queue: Arc<IndexQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Connection used by the synchronous dispatch mode
    pub fn synchronous_connection(mut self, connection: Box<dyn IndexConnection>) -> Self {
        self.sync_connection = Some(connection);
        self
    }

    /// Validate the configuration and assemble the pipeline
    ///
    /// # Errors
    /// `Config` for invalid values or a dispatch mode that does not match
    /// the supplied connection.
    pub fn build(self) -> ScribeResult<Pipeline> {
        self.config.validate()?;
        let mode = self.config.dispatch_mode()?;

        let registry = self.registry.unwrap_or_default();
        let queue = self.queue.unwrap_or_default();
        let buffers = Arc::new(BufferRegistry::new(Arc::clone(&queue)));
        let processor = Arc::new(OperationProcessor::new(Arc::clone(&registry)));

        let sink: Arc<dyn OperationSink> = match (mode, self.sync_connection) {
            (DispatchMode::Buffered, None) => Arc::new(BufferedSink::new(Arc::clone(&buffers))),
            (DispatchMode::Synchronous, Some(connection)) => {
                Arc::new(SynchronousSink::new(Arc::clone(&processor), connection))
            }
            (DispatchMode::Synchronous, None) => {
                return Err(ScribeError::config(
                    "dispatch = \"synchronous\" requires a synchronous connection",
                ))
            }
            (DispatchMode::Buffered, Some(_)) => {
                return Err(ScribeError::config(
                    "a synchronous connection was supplied but dispatch = \"buffered\"",
                ))
            }
        };

        let hubs: HubList = Arc::new(Mutex::new(Vec::new()));
        let settings = WorkerSettings {
            flush_threshold: self.config.flush_threshold,
            poll_timeout: self.config.poll_timeout(),
            requeue_unresolved: self.config.requeue_unresolved,
        };
        let mut worker = QueueWorker::new(Arc::clone(&queue), processor, settings);
        if self.config.invalidate_on_flush {
            let hubs = Arc::clone(&hubs);
            let hook: FlushHook = Arc::new(move || invalidate_all(&hubs));
            worker = worker.with_flush_hook(hook);
        }

        info!(target: "scribe::worker", dispatch = ?mode, "Pipeline ready");
        Ok(Pipeline {
            config: self.config,
            data_dir: self.data_dir,
            queue,
            buffers,
            registry,
            sink,
            worker,
            hubs,
            transactions: TransactionManager::new(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The assembled indexing pipeline
pub struct Pipeline {
    config: ScribeConfig,
    data_dir: Option<PathBuf>,
    queue: Arc<IndexQueue>,
    buffers: Arc<BufferRegistry>,
    registry: Arc<Registry>,
    sink: Arc<dyn OperationSink>,
    worker: QueueWorker,
    hubs: HubList,
    transactions: TransactionManager,
}

impl Pipeline {
    /// Start configuring a pipeline
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Open a pipeline configured by `<data_dir>/scribe.toml`
    pub fn open(data_dir: impl Into<PathBuf>) -> ScribeResult<Self> {
        PipelineBuilder::from_data_dir(data_dir)?.build()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Effective configuration
    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    /// Queue between committed transactions and the worker
    pub fn queue(&self) -> &Arc<IndexQueue> {
        &self.queue
    }

    /// Per-context buffers
    pub fn buffers(&self) -> &Arc<BufferRegistry> {
        &self.buffers
    }

    /// Collaborator registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ========================================================================
    // Producer side
    // ========================================================================

    /// Begin a standalone host transaction
    pub fn begin(&self) -> Transaction {
        self.transactions.begin()
    }

    /// Host transaction manager
    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Operation factory for objects of the default resolver
    pub fn factory(&self) -> OperationFactory {
        OperationFactory::new(Arc::clone(&self.registry), Arc::clone(&self.sink))
    }

    /// Operation factory for objects of the resolver registered under `tag`
    pub fn factory_for(&self, tag: impl Into<ResolverTag>) -> OperationFactory {
        self.factory().with_resolver(tag.into())
    }

    // ========================================================================
    // Worker administration
    // ========================================================================

    /// Start the worker bound to `connection`
    ///
    /// # Errors
    /// `WorkerAlreadyRunning` if the worker is already running.
    pub fn start_worker(&self, connection: Box<dyn IndexConnection>) -> ScribeResult<()> {
        self.worker.start(connection, false)
    }

    /// Start the worker unless it is already running
    pub fn ensure_worker(&self, connection: Box<dyn IndexConnection>) -> ScribeResult<()> {
        self.worker.start(connection, true)
    }

    /// Stop the worker and hand back its connection; no-op when stopped
    pub fn stop_worker(&self) -> Option<Box<dyn IndexConnection>> {
        self.worker.stop()
    }

    /// Whether the worker is running
    pub fn is_worker_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Worker statistics
    pub fn worker_stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    // ========================================================================
    // Search side
    // ========================================================================

    /// Hand out a search facade over a new hub for `opener`
    pub fn search<O>(&self, opener: O) -> IndexSearch<O>
    where
        O: ConnectionOpener + 'static,
    {
        let hub = Arc::new(ConnectionHub::new(opener, self.config.auto_refresh()));
        self.attach_search(hub)
    }

    /// Track an existing hub so pipeline-wide invalidation reaches it
    ///
    /// The pipeline only holds a weak reference; the hub lives as long as
    /// the returned facade or its clones.
    pub fn attach_search<O>(&self, hub: Arc<ConnectionHub<O>>) -> IndexSearch<O>
    where
        O: ConnectionOpener + 'static,
    {
        let tracked: Arc<dyn Invalidate> = hub.clone();
        let mut hubs = self.hubs.lock();
        hubs.retain(|h| h.strong_count() > 0);
        hubs.push(Arc::downgrade(&tracked));
        IndexSearch::new(hub)
    }

    /// Force every search connection handed out by this pipeline to reopen
    pub fn invalidate_search_connections(&self) {
        invalidate_all(&self.hubs);
    }

    /// Number of search hubs still in use
    pub fn attached_searches(&self) -> usize {
        let mut hubs = self.hubs.lock();
        hubs.retain(|h| h.strong_count() > 0);
        hubs.len()
    }

    // ========================================================================
    // Reference index backend
    // ========================================================================

    /// Configured index directory, created if missing
    ///
    /// Relative `index_path` values resolve against the data directory, or
    /// the current directory when the pipeline has none.
    pub fn index_directory(&self) -> ScribeResult<IndexDirectory> {
        let base = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        IndexDirectory::open(self.config.resolve_index_path(&base))
    }

    /// Writer on the configured index directory, for `start_worker`
    pub fn open_index_writer(&self) -> ScribeResult<IndexWriter> {
        IndexWriter::open(self.index_directory()?)
    }

    /// Search facade on the configured index directory
    pub fn directory_search(&self) -> ScribeResult<IndexSearch<DirectoryOpener>> {
        Ok(self.search(DirectoryOpener::new(self.index_directory()?)))
    }

    /// Data directory the configuration was loaded from, if any
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("queue", &self.queue)
            .field("buffers", &self.buffers)
            .field("worker", &self.worker)
            .field("search_hubs", &self.attached_searches())
            .finish()
    }
}
