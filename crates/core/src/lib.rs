//! Core types and traits for Scribe
//!
//! This crate defines the foundational types used throughout the pipeline:
//! - DocumentId / ResolverTag / ContextId: identifiers
//! - OperationKind / OperationRecord: one pending index mutation
//! - Document / Field: the indexable representation
//! - Error: Error type hierarchy
//! - Traits: collaborator interfaces (Resolver, DocumentBuilder, connections)
//! - Clock: time source for staleness windows

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod document;
pub mod error;
pub mod operation;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use document::{Document, Field, RESOLVER_FIELD};
pub use error::{ScribeError, ScribeResult};
pub use operation::{OperationKind, OperationRecord};
pub use traits::{
    ConnectionOpener, DocumentBuilder, IndexConnection, Indexable, Resolver, SearchConnection,
};
pub use types::{ContextId, DocumentId, ResolverTag};
