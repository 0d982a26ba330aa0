//! Background worker behavior
//!
//! Batching by flush threshold, idle flushes, error isolation,
//! stop semantics, and the requeue-once path for unresolvable records.

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn commit_adds(pipeline: &Pipeline, store: &PageStore, ids: &[&str]) {
    let factory = pipeline.factory();
    let mut txn = pipeline.begin();
    for id in ids {
        let page = Page::new(id, &format!("title of {}", id));
        store.put(page.clone());
        factory.add(&mut txn, &page).unwrap();
    }
    txn.commit().unwrap();
}

#[test]
fn threshold_batch_flushes_exactly_once() {
    let (pipeline, store) = pipeline(slow_config());
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    let ids: Vec<String> = (0..20).map(|i| format!("doc{:02}", i)).collect();
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    commit_adds(&pipeline, &store, &ids);

    wait_until("threshold flush", || conn.flushes() == 1);
    assert_eq!(conn.writes(), 20);
    assert_eq!(conn.labels().last().map(String::as_str), Some("flush"));

    // Nothing is pending, so stopping adds no flush
    pipeline.stop_worker().unwrap();
    assert_eq!(conn.flushes(), 1);

    let stats = pipeline.worker_stats();
    assert_eq!(stats.processed, 20);
    assert_eq!(stats.flushes, 1);
    assert_eq!(stats.pending, 0);
}

#[test]
fn idle_queue_flushes_pending_writes() {
    let (pipeline, store) = pipeline(fast_config());
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    commit_adds(&pipeline, &store, &["a", "b", "c"]);

    wait_until("idle flush", || pipeline.worker_stats().flushes == 1);
    // Records of one transaction reach the queue in no particular order
    let mut labels = conn.labels();
    assert_eq!(labels.pop().as_deref(), Some("flush"));
    labels.sort();
    assert_eq!(labels, vec!["add a", "add b", "add c"]);

    // Further idle periods with nothing pending do not flush again
    thread::sleep(Duration::from_millis(200));
    assert_eq!(conn.flushes(), 1);
}

#[test]
fn stop_flushes_remaining_writes() {
    let (pipeline, store) = pipeline(slow_config());
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    commit_adds(&pipeline, &store, &["a", "b"]);
    wait_until("records applied", || pipeline.worker_stats().processed == 2);
    assert_eq!(conn.flushes(), 0);

    pipeline.stop_worker().unwrap();
    let mut labels = conn.labels();
    assert_eq!(labels.pop().as_deref(), Some("flush"));
    labels.sort();
    assert_eq!(labels, vec!["add a", "add b"]);
}

#[test]
fn stop_is_prompt_and_idempotent() {
    let (pipeline, _store) = pipeline(slow_config());
    pipeline
        .start_worker(Box::new(RecordingConnection::new()))
        .unwrap();
    assert!(pipeline.is_worker_running());

    let started = std::time::Instant::now();
    assert!(pipeline.stop_worker().is_some());
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(!pipeline.is_worker_running());
    assert!(pipeline.stop_worker().is_none());
}

#[test]
fn huge_poll_timeout_still_stops_promptly() {
    let config = ScribeConfig {
        poll_timeout_ms: u64::MAX,
        ..ScribeConfig::default()
    };
    let (pipeline, store) = pipeline(config);
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    commit_adds(&pipeline, &store, &["a"]);
    wait_until("record applied", || pipeline.worker_stats().processed == 1);

    let started = std::time::Instant::now();
    pipeline.stop_worker().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(conn.labels(), vec!["add a", "flush"]);
}

#[test]
fn second_start_is_rejected_unless_silent() {
    let (pipeline, _store) = pipeline(slow_config());
    pipeline
        .start_worker(Box::new(RecordingConnection::new()))
        .unwrap();

    let err = pipeline
        .start_worker(Box::new(RecordingConnection::new()))
        .unwrap_err();
    assert!(matches!(err, ScribeError::WorkerAlreadyRunning));
    pipeline
        .ensure_worker(Box::new(RecordingConnection::new()))
        .unwrap();

    pipeline.stop_worker();
}

#[test]
fn worker_can_restart_with_returned_connection() {
    let (pipeline, store) = pipeline(fast_config());
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();
    let returned = pipeline.stop_worker().unwrap();

    pipeline.start_worker(returned).unwrap();
    commit_adds(&pipeline, &store, &["a"]);
    wait_until("idle flush", || conn.flushes() == 1);
    pipeline.stop_worker();

    assert_eq!(conn.labels(), vec!["add a", "flush"]);
}

#[test]
fn failing_record_does_not_block_the_next() {
    let (pipeline, store) = pipeline(fast_config());
    let conn = RecordingConnection::new();
    conn.fail_on("bad");
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    commit_adds(&pipeline, &store, &["bad", "good"]);

    wait_until("idle flush", || pipeline.worker_stats().flushes == 1);
    assert_eq!(conn.labels(), vec!["add good", "flush"]);

    let stats = pipeline.worker_stats();
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.failed, 1);
    pipeline.stop_worker();
}

#[test]
fn unresolvable_record_is_dropped_by_default() {
    let (pipeline, store) = pipeline(fast_config());
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    // Identified at enqueue, gone by the time the worker resolves it
    let mut txn = pipeline.begin();
    pipeline
        .factory()
        .add(&mut txn, &Page::new("ghost", "boo"))
        .unwrap();
    txn.commit().unwrap();
    commit_adds(&pipeline, &store, &["real"]);

    wait_until("idle flush", || pipeline.worker_stats().flushes == 1);
    assert_eq!(conn.labels(), vec!["add real", "flush"]);

    let stats = pipeline.worker_stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.requeued, 0);
    assert_eq!(store.resolve_calls(), 2);
    pipeline.stop_worker();
}

#[test]
fn unresolvable_record_is_requeued_once_when_enabled() {
    let config = ScribeConfig {
        requeue_unresolved: true,
        ..fast_config()
    };
    let (pipeline, store) = pipeline(config);
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    let mut txn = pipeline.begin();
    pipeline
        .factory()
        .modify(&mut txn, &Page::new("ghost", "boo"))
        .unwrap();
    txn.commit().unwrap();

    wait_until("record dropped", || pipeline.worker_stats().failed == 1);
    let stats = pipeline.worker_stats();
    assert_eq!(stats.requeued, 1);
    assert_eq!(stats.processed, 0);
    assert_eq!(store.resolve_calls(), 2);
    assert_eq!(conn.writes(), 0);
    pipeline.stop_worker();
}

#[test]
fn delete_needs_no_resolution() {
    let (pipeline, store) = pipeline(fast_config());
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    let mut txn = pipeline.begin();
    pipeline
        .factory()
        .remove(&mut txn, &Page::new("gone", "x"))
        .unwrap();
    txn.commit().unwrap();

    wait_until("idle flush", || conn.flushes() == 1);
    assert_eq!(conn.labels(), vec!["delete gone", "flush"]);
    assert_eq!(store.resolve_calls(), 0);
    pipeline.stop_worker();
}

#[test]
fn direct_add_then_modify_yields_add_then_replace() {
    let (pipeline, store) = pipeline(fast_config());
    store.put(Page::new("doc1", "v2"));
    let conn = RecordingConnection::new();

    pipeline
        .queue()
        .push(OperationRecord::add(doc_id("doc1"), ResolverTag::default()));
    pipeline
        .queue()
        .push(OperationRecord::modify(doc_id("doc1"), ResolverTag::default()));
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    wait_until("idle flush", || conn.flushes() == 1);
    assert_eq!(conn.labels(), vec!["add doc1", "replace doc1", "flush"]);
    pipeline.stop_worker();
}

#[test]
fn built_documents_carry_fields_and_resolver_tag() {
    let (pipeline, store) = pipeline(fast_config());
    store.put(Page::new("doc1", "Quarterly report"));
    let conn = RecordingConnection::new();
    pipeline
        .queue()
        .push(OperationRecord::add(doc_id("doc1"), ResolverTag::default()));
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    wait_until("idle flush", || conn.flushes() == 1);
    pipeline.stop_worker();

    let doc = match &conn.calls()[0] {
        Call::Add(doc) => doc.clone(),
        other => panic!("unexpected call {:?}", other),
    };
    assert_eq!(doc.id, Some(doc_id("doc1")));
    assert_eq!(doc.field("title"), Some("Quarterly report"));
    assert_eq!(doc.field("body"), Some(""));
    assert_eq!(doc.field(RESOLVER_FIELD), Some(""));
}

/// Resolver that panics for one id and defers to a `PageStore` otherwise
struct PanicsOn {
    id: &'static str,
    store: Arc<PageStore>,
}

impl Resolver for PanicsOn {
    fn id(&self, object: &dyn Indexable) -> Option<String> {
        self.store.id(object)
    }

    fn resolve(&self, id: &DocumentId) -> Option<Arc<dyn Indexable>> {
        if id.as_str() == self.id {
            panic!("resolver blew up on {}", id);
        }
        self.store.resolve(id)
    }
}

#[test]
fn panicking_resolver_does_not_halt_the_worker() {
    let (pipeline, store) = pipeline(fast_config());
    pipeline.registry().register_default_resolver(Arc::new(PanicsOn {
        id: "boom",
        store: store.clone(),
    }));
    let conn = RecordingConnection::new();
    pipeline.start_worker(Box::new(conn.clone())).unwrap();

    commit_adds(&pipeline, &store, &["boom"]);
    commit_adds(&pipeline, &store, &["good"]);

    wait_until("idle flush", || pipeline.worker_stats().flushes == 1);
    assert_eq!(conn.labels(), vec!["add good", "flush"]);
    assert!(pipeline.queue().is_empty());
    assert!(pipeline.is_worker_running());

    let stats = pipeline.worker_stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.processed, 1);
    assert!(pipeline.stop_worker().is_some());
}
