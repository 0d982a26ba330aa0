//! Reference full-text index for Scribe
//!
//! This crate provides a small directory-backed index that plugs into the
//! pipeline through the core connection traits:
//! - IndexWriter: `IndexConnection`, staged writes published per flush
//! - Searcher: `SearchConnection`, a point-in-time view refreshed by `reopen`
//! - DirectoryOpener: `ConnectionOpener` for the per-thread connection hub
//! - InvertedIndex + Bm25: term lookup and ranking
//! - Basic tokenizer
//!
//! # Usage
//!
//! ```ignore
//! use scribe_search::{DirectoryOpener, IndexDirectory, IndexWriter};
//!
//! let directory = IndexDirectory::open("/var/lib/scribe/index")?;
//! let writer = IndexWriter::open(directory.clone())?;
//! let opener = DirectoryOpener::new(directory);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod scorer;
pub mod searcher;
pub mod store;
pub mod tokenizer;
pub mod writer;

pub use index::{InvertedIndex, PostingEntry, PostingList};
pub use scorer::{Bm25, SearchHit};
pub use searcher::{DirectoryOpener, Searcher};
pub use store::{IndexDirectory, Snapshot, SNAPSHOT_FILE};
pub use tokenizer::{document_terms, tokenize, tokenize_unique};
pub use writer::IndexWriter;
