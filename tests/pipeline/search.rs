//! Search connection freshness
//!
//! A thread's connection is reused until it is invalidated or the
//! auto-refresh window passes; a reopen happens on the next use only.

use crate::common::*;
use scribe::{
    ConnectionHub, DirectoryOpener, IndexDirectory, IndexWriter, ManualClock, Timestamp,
};
use std::sync::Arc;
use std::time::Duration;

fn page_doc(id: &str, title: &str) -> Document {
    let mut doc = Document::new().with_field("title", title);
    doc.id = Some(doc_id(id));
    doc
}

struct Fixture {
    _dir: tempfile::TempDir,
    writer: IndexWriter,
    clock: Arc<ManualClock>,
    pipeline: Pipeline,
    search: scribe::IndexSearch<DirectoryOpener>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let directory = IndexDirectory::open(dir.path().join("index")).unwrap();
    let mut writer = IndexWriter::open(directory.clone()).unwrap();
    writer.add(page_doc("a", "annual summary")).unwrap();
    writer.flush().unwrap();

    let (pipeline, _store) = pipeline(slow_config());
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(100)));
    let hub = ConnectionHub::with_clock(
        DirectoryOpener::new(directory),
        Duration::from_secs(20),
        clock.clone(),
    );
    let search = pipeline.attach_search(Arc::new(hub));
    Fixture {
        _dir: dir,
        writer,
        clock,
        pipeline,
        search,
    }
}

fn visible(search: &scribe::IndexSearch<DirectoryOpener>) -> usize {
    search.with_connection(|s| s.doc_count()).unwrap()
}

#[test]
fn invalidation_is_observed_on_next_use() {
    let mut f = fixture();
    assert_eq!(visible(&f.search), 1);

    f.writer.add(page_doc("b", "budget draft")).unwrap();
    f.writer.flush().unwrap();

    // T+3: still inside the window, the cached connection is reused
    f.clock.advance(Duration::from_secs(3));
    assert_eq!(visible(&f.search), 1);

    // T+5: invalidation makes the next use reopen
    f.clock.advance(Duration::from_secs(2));
    f.pipeline.invalidate_search_connections();
    assert_eq!(visible(&f.search), 2);
    let hits = f
        .search
        .with_connection(|s| s.search("budget", 10))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, doc_id("b"));
}

#[test]
fn stale_connection_refreshes_after_window() {
    let mut f = fixture();
    assert_eq!(visible(&f.search), 1);

    f.writer.add(page_doc("b", "budget draft")).unwrap();
    f.writer.flush().unwrap();

    f.clock.advance(Duration::from_secs(20));
    assert_eq!(visible(&f.search), 1);

    f.clock.advance(Duration::from_secs(1));
    assert_eq!(visible(&f.search), 2);
    assert_eq!(f.search.hub().modified(), Timestamp::from_secs(121));
}

#[test]
fn each_thread_gets_its_own_connection() {
    let f = fixture();
    let local = f.search.connection().unwrap();

    let search = f.search.clone();
    let remote = std::thread::spawn(move || search.connection().unwrap())
        .join()
        .unwrap();

    assert!(!Arc::ptr_eq(&local, &remote));
    assert!(Arc::ptr_eq(&local, &f.search.connection().unwrap()));
    // The exited thread's slot is gone
    assert_eq!(f.search.hub().cached_connections(), 1);
}

#[test]
fn short_lived_threads_do_not_accumulate_connections() {
    let f = fixture();
    for _ in 0..50 {
        let search = f.search.clone();
        std::thread::spawn(move || {
            assert_eq!(visible(&search), 1);
        })
        .join()
        .unwrap();
    }
    assert_eq!(f.search.hub().cached_connections(), 0);
}
