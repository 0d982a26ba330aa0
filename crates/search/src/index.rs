//! In-memory inverted index over a loaded snapshot
//!
//! Each `Searcher` builds one of these from the documents of the
//! generation it opened. The index is owned by that searcher and never
//! shared, so plain maps are enough.
//!
//! Re-indexing a document removes its previous postings first, which
//! keeps `total_doc_len` and the document frequencies exact.

use crate::tokenizer::document_terms;
use scribe_core::{Document, DocumentId};
use std::collections::HashMap;

// ============================================================================
// PostingEntry
// ============================================================================

/// Entry in a posting list
#[derive(Debug, Clone, PartialEq)]
pub struct PostingEntry {
    /// Document containing the term
    pub doc_id: DocumentId,
    /// Term frequency in this document
    pub tf: u32,
    /// Document length in tokens
    pub doc_len: u32,
}

// ============================================================================
// PostingList
// ============================================================================

/// Documents containing one term
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    /// Document entries, in indexing order
    pub entries: Vec<PostingEntry>,
}

impl PostingList {
    fn remove(&mut self, doc_id: &DocumentId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| &e.doc_id != doc_id);
        before - self.entries.len()
    }

    /// Number of documents containing this term
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no document contains this term
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// InvertedIndex
// ============================================================================

/// Term -> posting list mapping with corpus statistics for BM25
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingList>,
    doc_lengths: HashMap<DocumentId, u32>,
    total_doc_len: usize,
}

impl InvertedIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over `docs`; documents without an id are skipped
    pub fn from_documents<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut index = Self::new();
        for doc in docs {
            if let Some(id) = &doc.id {
                index.index_document(id, doc);
            }
        }
        index
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Number of indexed documents
    pub fn total_docs(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Number of documents containing `term`
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map(|p| p.len()).unwrap_or(0)
    }

    /// Average document length in tokens
    pub fn avg_doc_len(&self) -> f32 {
        let total = self.total_docs();
        if total == 0 {
            return 0.0;
        }
        self.total_doc_len as f32 / total as f32
    }

    /// IDF with smoothing: `ln((N - df + 0.5) / (df + 0.5) + 1)`
    pub fn compute_idf(&self, term: &str) -> f32 {
        let n = self.total_docs() as f32;
        let df = self.doc_freq(term) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Index `doc` under `id`, replacing any previous postings for `id`
    pub fn index_document(&mut self, id: &DocumentId, doc: &Document) {
        if self.doc_lengths.contains_key(id) {
            self.remove_document(id);
        }

        let terms = document_terms(doc);
        let doc_len = terms.len() as u32;

        let mut tf_map: HashMap<String, u32> = HashMap::new();
        for term in terms {
            *tf_map.entry(term).or_insert(0) += 1;
        }

        for (term, tf) in tf_map {
            self.postings.entry(term).or_default().entries.push(PostingEntry {
                doc_id: id.clone(),
                tf,
                doc_len,
            });
        }

        self.doc_lengths.insert(id.clone(), doc_len);
        self.total_doc_len += doc_len as usize;
    }

    /// Remove every posting of `id`; returns whether it was indexed
    pub fn remove_document(&mut self, id: &DocumentId) -> bool {
        let Some(doc_len) = self.doc_lengths.remove(id) else {
            return false;
        };
        self.postings.retain(|_, list| {
            list.remove(id);
            !list.is_empty()
        });
        self.total_doc_len = self.total_doc_len.saturating_sub(doc_len as usize);
        true
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Posting list for `term`
    pub fn lookup(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }
}
