//! Indexable document representation
//!
//! A `Document` is what a `DocumentBuilder` produces from a resolved
//! object and what an `IndexConnection` stores: an optional id plus an
//! ordered list of named text fields.

use crate::types::{DocumentId, ResolverTag};
use serde::{Deserialize, Serialize};

/// Field that records which resolver produced a document
pub const RESOLVER_FIELD: &str = "resolver";

/// Named text field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field text
    pub value: String,
}

impl Field {
    /// Create a field
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Document to be written to the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identity in the index; set by the worker before insertion
    pub id: Option<DocumentId>,
    /// Fields in insertion order; names may repeat
    pub fields: Vec<Field>,
}

impl Document {
    /// Create an empty document without an id
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field append
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_field(name, value);
        self
    }

    /// Append a field
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field::new(name, value));
    }

    /// First value stored under `name`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Tag the document with the resolver that owns its id
    ///
    /// The default resolver is recorded as an empty string.
    pub fn tag_resolver(&mut self, tag: &ResolverTag) {
        self.push_field(RESOLVER_FIELD, tag.as_str());
    }

    /// Resolver tag recorded on this document, if any
    pub fn resolver(&self) -> Option<ResolverTag> {
        self.field(RESOLVER_FIELD).map(ResolverTag::new)
    }

    /// Iterate over all field values, excluding the resolver field
    pub fn text(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.name != RESOLVER_FIELD)
            .map(|f| f.value.as_str())
    }
}
