//! Write connection to an index directory
//!
//! `IndexWriter` stages changes in memory and publishes them as a new
//! generation on `flush`. Until then no searcher can observe them.
//!
//! - `add` of an id that is already stored overwrites it
//! - `replace` of an id that is not stored inserts it
//! - `delete` of an id that is not stored is a no-op

use crate::store::{IndexDirectory, Snapshot, SNAPSHOT_VERSION};
use scribe_core::{Document, DocumentId, IndexConnection, ScribeError, ScribeResult};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Staged write handle; owned by the index worker
#[derive(Debug)]
pub struct IndexWriter {
    directory: IndexDirectory,
    generation: u64,
    documents: BTreeMap<DocumentId, Document>,
    dirty: bool,
}

impl IndexWriter {
    /// Open a writer on the latest generation of `directory`
    pub fn open(directory: IndexDirectory) -> ScribeResult<Self> {
        let snapshot = directory.load()?;
        let mut documents = BTreeMap::new();
        for doc in snapshot.documents {
            if let Some(id) = doc.id.clone() {
                documents.insert(id, doc);
            }
        }
        debug!(
            target: "scribe::index",
            path = %directory.path().display(),
            generation = snapshot.generation,
            documents = documents.len(),
            "Opened index writer"
        );
        Ok(Self {
            directory,
            generation: snapshot.generation,
            documents,
            dirty: false,
        })
    }

    /// Generation of the last flush this writer saw or produced
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether there are unflushed changes
    pub fn has_pending_changes(&self) -> bool {
        self.dirty
    }

    /// Number of documents including unflushed changes
    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    /// Staged document for `id`
    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id)
    }

    fn store(&mut self, doc: Document) -> ScribeResult<Option<Document>> {
        let id = doc
            .id
            .clone()
            .ok_or_else(|| ScribeError::invalid_input("document has no id"))?;
        self.dirty = true;
        Ok(self.documents.insert(id, doc))
    }
}

impl IndexConnection for IndexWriter {
    fn add(&mut self, doc: Document) -> ScribeResult<()> {
        if let Some(previous) = self.store(doc)? {
            debug!(target: "scribe::index", id = ?previous.id, "Add overwrote stored document");
        }
        Ok(())
    }

    fn replace(&mut self, doc: Document) -> ScribeResult<()> {
        self.store(doc).map(|_| ())
    }

    fn delete(&mut self, id: &DocumentId) -> ScribeResult<()> {
        if self.documents.remove(id).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    fn flush(&mut self) -> ScribeResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            generation: self.generation + 1,
            documents: self.documents.values().cloned().collect(),
        };
        self.directory.store(&snapshot)?;
        self.generation = snapshot.generation;
        self.dirty = false;
        info!(
            target: "scribe::index",
            generation = self.generation,
            documents = snapshot.documents.len(),
            "Index flushed"
        );
        Ok(())
    }
}
