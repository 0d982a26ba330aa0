//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

pub use scribe::{
    Document, DocumentId, IndexConnection, Indexable, OperationKind, OperationRecord, Pipeline,
    Registry, Resolver, ResolverTag, ScribeConfig, ScribeError, ScribeResult, RESOLVER_FIELD,
};

// ============================================================================
// Logging
// ============================================================================

static INIT_LOGGING: Once = Once::new();

/// Route pipeline logs to the test harness output.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Domain objects
// ============================================================================

/// Minimal indexable object
#[derive(Debug, Clone)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub body: Option<String>,
}

impl Page {
    pub fn new(id: &str, title: &str) -> Self {
        Page {
            id: id.to_string(),
            title: title.to_string(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }
}

impl Indexable for Page {
    fn kind(&self) -> &str {
        "page"
    }

    fn text_fields(&self) -> Vec<(String, Option<String>)> {
        vec![
            ("title".to_string(), Some(self.title.clone())),
            ("body".to_string(), self.body.clone()),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// In-memory resolver over `Page`s
///
/// `id()` answers for any page with a non-empty id; `resolve()` only for
/// pages that were `put`.
#[derive(Default)]
pub struct PageStore {
    pages: Mutex<HashMap<String, Arc<Page>>>,
    resolves: AtomicUsize,
}

impl PageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(PageStore::default())
    }

    pub fn put(&self, page: Page) {
        self.pages.lock().insert(page.id.clone(), Arc::new(page));
    }

    pub fn remove(&self, id: &str) {
        self.pages.lock().remove(id);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl Resolver for PageStore {
    fn id(&self, object: &dyn Indexable) -> Option<String> {
        object
            .as_any()
            .downcast_ref::<Page>()
            .map(|p| p.id.clone())
            .filter(|id| !id.is_empty())
    }

    fn resolve(&self, id: &DocumentId) -> Option<Arc<dyn Indexable>> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .get(id.as_str())
            .map(|p| Arc::clone(p) as Arc<dyn Indexable>)
    }
}

// ============================================================================
// Recording connection
// ============================================================================

/// One call observed by a `RecordingConnection`
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Add(Document),
    Replace(Document),
    Delete(String),
    Flush,
}

impl Call {
    /// Compact rendering: `add doc1`, `replace doc1`, `delete doc1`, `flush`
    pub fn label(&self) -> String {
        fn id(doc: &Document) -> &str {
            doc.id.as_ref().map(|id| id.as_str()).unwrap_or("<none>")
        }
        match self {
            Call::Add(doc) => format!("add {}", id(doc)),
            Call::Replace(doc) => format!("replace {}", id(doc)),
            Call::Delete(id) => format!("delete {}", id),
            Call::Flush => "flush".to_string(),
        }
    }
}

/// Index connection that records every call into a shared journal
///
/// Clones share the journal, so a test keeps one clone and hands the
/// other to the pipeline. Ids listed in `fail_on` make `add`/`replace`
/// fail.
#[derive(Clone, Default)]
pub struct RecordingConnection {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_on: Arc<Mutex<Vec<String>>>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, id: &str) {
        self.fail_on.lock().push(id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls.lock().iter().map(Call::label).collect()
    }

    pub fn flushes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Flush))
            .count()
    }

    pub fn writes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| !matches!(c, Call::Flush))
            .count()
    }

    fn check(&self, doc: &Document) -> ScribeResult<()> {
        let id = doc.id.as_ref().map(|id| id.as_str().to_string()).unwrap_or_default();
        if self.fail_on.lock().contains(&id) {
            return Err(ScribeError::index(format!("rejected {}", id)));
        }
        Ok(())
    }
}

impl IndexConnection for RecordingConnection {
    fn add(&mut self, doc: Document) -> ScribeResult<()> {
        self.check(&doc)?;
        self.calls.lock().push(Call::Add(doc));
        Ok(())
    }

    fn replace(&mut self, doc: Document) -> ScribeResult<()> {
        self.check(&doc)?;
        self.calls.lock().push(Call::Replace(doc));
        Ok(())
    }

    fn delete(&mut self, id: &DocumentId) -> ScribeResult<()> {
        self.calls.lock().push(Call::Delete(id.as_str().to_string()));
        Ok(())
    }

    fn flush(&mut self) -> ScribeResult<()> {
        self.calls.lock().push(Call::Flush);
        Ok(())
    }
}

// ============================================================================
// Pipelines
// ============================================================================

/// Buffered pipeline with a `PageStore` as default resolver
pub fn pipeline(config: ScribeConfig) -> (Pipeline, Arc<PageStore>) {
    init_logging();
    let pipeline = Pipeline::builder().config(config).build().unwrap();
    let store = PageStore::new();
    pipeline.registry().register_default_resolver(store.clone());
    (pipeline, store)
}

/// Config with a short poll timeout so idle flushes happen quickly
pub fn fast_config() -> ScribeConfig {
    ScribeConfig {
        poll_timeout_ms: 50,
        ..ScribeConfig::default()
    }
}

/// Config whose idle flush never fires during a test
pub fn slow_config() -> ScribeConfig {
    ScribeConfig {
        poll_timeout_ms: 60_000,
        ..ScribeConfig::default()
    }
}

pub fn doc_id(id: &str) -> DocumentId {
    DocumentId::new(id).unwrap()
}

/// Poll `cond` until it holds, failing the test after 10 seconds
pub fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(5));
    }
}
