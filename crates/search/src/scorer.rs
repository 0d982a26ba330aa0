//! BM25-Lite relevance scoring
//!
//! For each query term t present in a document:
//!
//! ```text
//! score += IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl / avgdl))
//! ```
//!
//! - tf = term frequency in the document
//! - dl = document length, avgdl = average document length
//! - k1 = term saturation (default 1.2), b = length normalization (default 0.75)

use crate::index::InvertedIndex;
use scribe_core::DocumentId;
use std::collections::HashMap;

/// One scored search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Matching document
    pub id: DocumentId,
    /// Relevance; higher is better
    pub score: f32,
}

/// BM25 parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    k1: f32,
    b: f32,
}

impl Default for Bm25 {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Bm25 {
    /// Scorer with custom parameters
    pub fn new(k1: f32, b: f32) -> Self {
        Self { k1, b }
    }

    /// Score every document matching at least one of `terms`
    ///
    /// Hits are sorted by descending score, ties broken by id so the
    /// order is deterministic.
    pub fn rank(&self, index: &InvertedIndex, terms: &[String]) -> Vec<SearchHit> {
        let avg_len = index.avg_doc_len().max(1.0);
        let mut scores: HashMap<&DocumentId, f32> = HashMap::new();

        for term in terms {
            let Some(postings) = index.lookup(term) else {
                continue;
            };
            let idf = index.compute_idf(term);
            for entry in &postings.entries {
                let tf = entry.tf as f32;
                let dl = entry.doc_len as f32;
                let tf_component =
                    (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * dl / avg_len));
                *scores.entry(&entry.doc_id).or_insert(0.0) += idf * tf_component;
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(id, score)| SearchHit {
                id: id.clone(),
                score,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }
}
