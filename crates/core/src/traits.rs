//! Collaborator interfaces
//!
//! The pipeline never inspects domain objects or index internals itself.
//! It talks to them through these traits:
//!
//! - `Indexable`: a domain object that can be indexed
//! - `Resolver`: object <-> stable identifier mapping
//! - `DocumentBuilder`: object -> `Document`
//! - `IndexConnection`: write handle to the index (owned by one thread)
//! - `SearchConnection` / `ConnectionOpener`: read handles cached per thread

use crate::document::Document;
use crate::error::ScribeResult;
use crate::types::DocumentId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A domain object that participates in indexing
pub trait Indexable: Any + Send + Sync + fmt::Debug {
    /// Object kind, used to select a registered `DocumentBuilder`
    fn kind(&self) -> &str;

    /// Text fields exposed to the default builder
    ///
    /// `None` values are indexed as empty strings.
    fn text_fields(&self) -> Vec<(String, Option<String>)> {
        Vec::new()
    }

    /// Downcast hook for kind-specific builders
    fn as_any(&self) -> &dyn Any;
}

/// Maps domain objects to stable identifiers and back
///
/// Identifiers are resolver specific, which is why every stored document
/// records the tag of the resolver that produced it.
pub trait Resolver: Send + Sync {
    /// Identifier of `object`, or `None` if it has none
    ///
    /// An empty string is treated the same as `None`.
    fn id(&self, object: &dyn Indexable) -> Option<String>;

    /// Object behind `id`, or `None` if it no longer exists
    fn resolve(&self, id: &DocumentId) -> Option<Arc<dyn Indexable>>;
}

/// Turns a resolved object into an indexable document
pub trait DocumentBuilder: Send + Sync {
    /// Build the document for `object`
    ///
    /// The connection is passed for builders that adapt to the index's
    /// field configuration.
    fn build(
        &self,
        object: &dyn Indexable,
        connection: &dyn IndexConnection,
    ) -> ScribeResult<Document>;
}

/// Write handle to the index
///
/// Not required to be `Sync`: a connection is used by exactly one thread.
/// Writes become durable and visible to readers on `flush`.
pub trait IndexConnection: Send {
    /// Insert a new document; `doc.id` is set
    fn add(&mut self, doc: Document) -> ScribeResult<()>;

    /// Replace the document with the same id, inserting if absent
    fn replace(&mut self, doc: Document) -> ScribeResult<()>;

    /// Remove the document with `id`; a missing document is not an error
    fn delete(&mut self, id: &DocumentId) -> ScribeResult<()>;

    /// Commit pending writes to durable storage
    fn flush(&mut self) -> ScribeResult<()>;
}

impl<C: IndexConnection + ?Sized> IndexConnection for Box<C> {
    fn add(&mut self, doc: Document) -> ScribeResult<()> {
        (**self).add(doc)
    }

    fn replace(&mut self, doc: Document) -> ScribeResult<()> {
        (**self).replace(doc)
    }

    fn delete(&mut self, id: &DocumentId) -> ScribeResult<()> {
        (**self).delete(id)
    }

    fn flush(&mut self) -> ScribeResult<()> {
        (**self).flush()
    }
}

/// Read handle to the index
pub trait SearchConnection: Send {
    /// Refresh the handle in place so it observes the latest flushed state
    fn reopen(&mut self) -> ScribeResult<()>;
}

/// Opens search connections against a configured index location
pub trait ConnectionOpener: Send + Sync {
    /// Connection type produced
    type Connection: SearchConnection;

    /// Open a new connection
    fn open(&self) -> ScribeResult<Self::Connection>;
}
