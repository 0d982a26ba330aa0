//! Synchronous dispatch
//!
//! Each producer call is applied and flushed before it returns, with no
//! buffering and no worker involved.

use crate::common::*;

fn synchronous() -> (Pipeline, std::sync::Arc<PageStore>, RecordingConnection) {
    init_logging();
    let conn = RecordingConnection::new();
    let config = ScribeConfig {
        dispatch: "synchronous".to_string(),
        ..slow_config()
    };
    let pipeline = Pipeline::builder()
        .config(config)
        .synchronous_connection(Box::new(conn.clone()))
        .build()
        .unwrap();
    let store = PageStore::new();
    pipeline.registry().register_default_resolver(store.clone());
    (pipeline, store, conn)
}

#[test]
fn operations_apply_before_the_call_returns() {
    let (pipeline, store, conn) = synchronous();
    let page = Page::new("doc1", "hello");
    store.put(page.clone());
    let mut txn = pipeline.begin();

    pipeline.factory().add(&mut txn, &page).unwrap();
    assert_eq!(conn.labels(), vec!["add doc1", "flush"]);

    pipeline.factory().modify(&mut txn, &page).unwrap();
    pipeline.factory().remove(&mut txn, &page).unwrap();
    assert_eq!(
        conn.labels(),
        vec!["add doc1", "flush", "replace doc1", "flush", "delete doc1", "flush"]
    );

    assert!(pipeline.queue().is_empty());
    assert_eq!(txn.participant_count(), 0);
    txn.commit().unwrap();
    assert!(pipeline.queue().is_empty());
}

#[test]
fn abort_does_not_undo_synchronous_writes() {
    let (pipeline, store, conn) = synchronous();
    let page = Page::new("doc1", "hello");
    store.put(page.clone());
    let mut txn = pipeline.begin();

    pipeline.factory().add(&mut txn, &page).unwrap();
    txn.abort("rolled back").unwrap();

    assert_eq!(conn.labels(), vec!["add doc1", "flush"]);
}

#[test]
fn processing_errors_reach_the_caller() {
    let (pipeline, _store, conn) = synchronous();
    let mut txn = pipeline.begin();

    let err = pipeline
        .factory()
        .add(&mut txn, &Page::new("missing", "never stored"))
        .unwrap_err();
    assert!(err.is_resolution_failure());
    assert!(conn.calls().is_empty());
}
