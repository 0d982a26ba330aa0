//! Transaction-scoped buffering
//!
//! Nothing reaches the queue before commit; abort leaves no trace; the
//! merge table only applies inside one transaction.

use crate::common::*;
use scribe::{OperationKind, TransactionHandle};
use std::thread;

fn drain_kinds(pipeline: &Pipeline) -> Vec<(String, OperationKind)> {
    let mut out = Vec::new();
    while let Some(record) = pipeline.queue().try_pop() {
        out.push((record.target_id.as_str().to_string(), record.kind));
    }
    out
}

#[test]
fn commit_enqueues_each_buffered_record() {
    let (pipeline, _store) = pipeline(slow_config());
    let factory = pipeline.factory();
    let mut txn = pipeline.begin();

    factory.add(&mut txn, &Page::new("a", "alpha")).unwrap();
    factory.modify(&mut txn, &Page::new("b", "beta")).unwrap();
    factory.remove(&mut txn, &Page::new("c", "gamma")).unwrap();

    assert!(pipeline.queue().is_empty());
    assert_eq!(pipeline.buffers().pending(txn.context_id()), 3);

    txn.commit().unwrap();

    assert_eq!(pipeline.queue().len(), 3);
    assert_eq!(pipeline.buffers().active_contexts(), 0);
}

#[test]
fn abort_enqueues_nothing() {
    let (pipeline, _store) = pipeline(slow_config());
    let factory = pipeline.factory();
    let mut txn = pipeline.begin();

    factory.add(&mut txn, &Page::new("a", "alpha")).unwrap();
    factory.add(&mut txn, &Page::new("b", "beta")).unwrap();
    txn.abort("rolled back").unwrap();

    assert!(pipeline.queue().is_empty());
    assert_eq!(pipeline.buffers().active_contexts(), 0);
    assert_eq!(pipeline.queue().total_enqueued(), 0);
}

#[test]
fn add_then_delete_in_one_transaction_cancels() {
    let (pipeline, _store) = pipeline(slow_config());
    let factory = pipeline.factory();
    let page = Page::new("doc1", "draft");
    let mut txn = pipeline.begin();

    factory.add(&mut txn, &page).unwrap();
    factory.remove(&mut txn, &page).unwrap();
    txn.commit().unwrap();

    assert!(pipeline.queue().is_empty());
}

#[test]
fn add_then_modify_in_one_transaction_keeps_add() {
    let (pipeline, _store) = pipeline(slow_config());
    let factory = pipeline.factory();
    let page = Page::new("doc1", "draft");
    let mut txn = pipeline.begin();

    factory.add(&mut txn, &page).unwrap();
    factory.modify(&mut txn, &page).unwrap();
    txn.commit().unwrap();

    assert_eq!(
        drain_kinds(&pipeline),
        vec![("doc1".to_string(), OperationKind::Add)]
    );
}

#[test]
fn separate_transactions_are_not_merged() {
    let (pipeline, _store) = pipeline(slow_config());
    let factory = pipeline.factory();
    let page = Page::new("doc1", "draft");

    let mut first = pipeline.begin();
    factory.add(&mut first, &page).unwrap();
    first.commit().unwrap();

    let mut second = pipeline.begin();
    factory.remove(&mut second, &page).unwrap();
    second.commit().unwrap();

    assert_eq!(
        drain_kinds(&pipeline),
        vec![
            ("doc1".to_string(), OperationKind::Add),
            ("doc1".to_string(), OperationKind::Delete),
        ]
    );
}

#[test]
fn missing_identifier_fails_the_producer() {
    let (pipeline, _store) = pipeline(slow_config());
    let factory = pipeline.factory();
    let mut txn = pipeline.begin();

    let err = factory.add(&mut txn, &Page::new("", "untitled")).unwrap_err();
    assert!(matches!(err, ScribeError::IdentifierNotFound { .. }));

    // The transaction itself is unaffected
    factory.add(&mut txn, &Page::new("a", "alpha")).unwrap();
    txn.commit().unwrap();
    assert_eq!(pipeline.queue().len(), 1);
}

#[test]
fn records_carry_the_factory_resolver_tag() {
    let (pipeline, store) = pipeline(slow_config());
    pipeline
        .registry()
        .register_resolver(ResolverTag::new("archive"), store.clone());
    let mut txn = pipeline.begin();

    pipeline
        .factory_for("archive")
        .add(&mut txn, &Page::new("a", "alpha"))
        .unwrap();
    txn.commit().unwrap();

    let record = pipeline.queue().try_pop().unwrap();
    assert_eq!(record.resolver_tag.as_str(), "archive");
}

#[test]
fn unknown_resolver_tag_is_rejected_at_enqueue() {
    let (pipeline, _store) = pipeline(slow_config());
    let mut txn = pipeline.begin();

    let err = pipeline
        .factory_for("nowhere")
        .add(&mut txn, &Page::new("a", "alpha"))
        .unwrap_err();
    assert!(matches!(err, ScribeError::UnknownResolver { .. }));
    assert_eq!(pipeline.buffers().active_contexts(), 0);
}

#[test]
fn concurrent_transactions_keep_separate_buffers() {
    let (pipeline, _store) = pipeline(slow_config());

    thread::scope(|s| {
        s.spawn(|| {
            let mut txn = pipeline.begin();
            pipeline.factory().add(&mut txn, &Page::new("kept", "k")).unwrap();
            txn.commit().unwrap();
        });
        s.spawn(|| {
            let mut txn = pipeline.begin();
            pipeline
                .factory()
                .add(&mut txn, &Page::new("dropped", "d"))
                .unwrap();
            txn.abort("cancelled").unwrap();
        });
    });

    assert_eq!(
        drain_kinds(&pipeline),
        vec![("kept".to_string(), OperationKind::Add)]
    );
}
