//! Identifier types
//!
//! This module defines the identifiers that flow through the pipeline:
//! - DocumentId: stable identifier of an indexed object (the dedupe key)
//! - ResolverTag: name of the resolver that owns an identifier
//! - ContextId: token naming one logical transaction

use crate::error::{ScribeError, ScribeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an indexed object
///
/// Doubles as the document id in the index and as the dedupe key inside a
/// transaction buffer. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document id, rejecting empty identifiers
    ///
    /// # Errors
    /// Returns `InvalidInput` if `id` is empty.
    pub fn new(id: impl Into<String>) -> ScribeResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ScribeError::invalid_input("document id must not be empty"));
        }
        Ok(Self(id))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned identifier
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of the resolver that produced an identifier
///
/// The empty tag selects the default resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolverTag(String);

impl ResolverTag {
    /// The default resolver tag
    pub fn default_resolver() -> Self {
        Self(String::new())
    }

    /// Create a named resolver tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Whether this tag selects the default resolver
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolverTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for ResolverTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Token naming one logical transaction / execution context
///
/// Transaction buffers are keyed by this token rather than by ambient
/// thread-local state, so callers pass it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(u64);

impl ContextId {
    /// Wrap a raw context number
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw context number
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}
