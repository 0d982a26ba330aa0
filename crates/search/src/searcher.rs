//! Read connection to an index directory
//!
//! A `Searcher` sees exactly one generation: the one that was on disk
//! when it was opened or last reopened. Flushes by the writer become
//! visible only after `reopen`.

use crate::index::InvertedIndex;
use crate::scorer::{Bm25, SearchHit};
use crate::store::IndexDirectory;
use crate::tokenizer::tokenize_unique;
use scribe_core::{ConnectionOpener, Document, DocumentId, ScribeResult, SearchConnection};
use std::collections::HashMap;
use tracing::debug;

/// Point-in-time view of an index directory
#[derive(Debug)]
pub struct Searcher {
    directory: IndexDirectory,
    generation: u64,
    documents: HashMap<DocumentId, Document>,
    index: InvertedIndex,
    scorer: Bm25,
}

impl Searcher {
    /// Open a searcher on the latest generation of `directory`
    pub fn open(directory: IndexDirectory) -> ScribeResult<Self> {
        let mut searcher = Self {
            directory,
            generation: 0,
            documents: HashMap::new(),
            index: InvertedIndex::new(),
            scorer: Bm25::default(),
        };
        searcher.load()?;
        Ok(searcher)
    }

    fn load(&mut self) -> ScribeResult<()> {
        let snapshot = self.directory.load()?;
        let documents: HashMap<DocumentId, Document> = snapshot
            .documents
            .into_iter()
            .filter_map(|doc| doc.id.clone().map(|id| (id, doc)))
            .collect();
        self.index = InvertedIndex::from_documents(documents.values());
        self.documents = documents;
        self.generation = snapshot.generation;
        Ok(())
    }

    /// Generation this searcher currently sees
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of visible documents
    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    /// Visible document for `id`
    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Rank visible documents against a free-text query
    ///
    /// Returns at most `limit` hits, best first. A query without any
    /// searchable term matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let terms = tokenize_unique(query);
        if terms.is_empty() {
            return Vec::new();
        }
        let mut hits = self.scorer.rank(&self.index, &terms);
        hits.truncate(limit);
        hits
    }
}

impl SearchConnection for Searcher {
    fn reopen(&mut self) -> ScribeResult<()> {
        let before = self.generation;
        self.load()?;
        debug!(
            target: "scribe::index",
            from = before,
            to = self.generation,
            "Searcher reopened"
        );
        Ok(())
    }
}

/// Opens `Searcher`s on one directory
#[derive(Debug, Clone)]
pub struct DirectoryOpener {
    directory: IndexDirectory,
}

impl DirectoryOpener {
    /// Opener for `directory`
    pub fn new(directory: IndexDirectory) -> Self {
        Self { directory }
    }

    /// Directory searchers are opened on
    pub fn directory(&self) -> &IndexDirectory {
        &self.directory
    }
}

impl ConnectionOpener for DirectoryOpener {
    type Connection = Searcher;

    fn open(&self) -> ScribeResult<Searcher> {
        Searcher::open(self.directory.clone())
    }
}
