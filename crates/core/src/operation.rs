//! Pending index mutations
//!
//! An `OperationRecord` names one object (by id and resolver) and what
//! should happen to its document. Records carry no object state; the
//! worker resolves the object again when it applies the record.

use crate::types::{DocumentId, ResolverTag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of index mutation
///
/// Discriminants are the merge ranks: when two records for the same
/// document meet in one transaction, the higher rank wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Replace (upsert) the document
    Modify = 0,
    /// Insert a new document
    Add = 1,
    /// Remove the document
    Delete = 2,
}

impl OperationKind {
    /// Merge precedence: Delete (2) > Add (1) > Modify (0)
    #[inline]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Whether applying this kind needs the object resolved first
    #[inline]
    pub const fn needs_resolution(self) -> bool {
        !matches!(self, OperationKind::Delete)
    }

    /// Lowercase name used in log fields
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationKind::Modify => "modify",
            OperationKind::Add => "add",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending index mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Stable identifier of the affected object
    pub target_id: DocumentId,
    /// Resolver that owns `target_id`
    pub resolver_tag: ResolverTag,
    /// What to do with the document
    pub kind: OperationKind,
    /// Set once the worker has pushed this record back after a failed resolve
    #[serde(default)]
    pub requeued: bool,
}

impl OperationRecord {
    /// Create a record of the given kind
    pub fn new(target_id: DocumentId, resolver_tag: ResolverTag, kind: OperationKind) -> Self {
        Self {
            target_id,
            resolver_tag,
            kind,
            requeued: false,
        }
    }

    /// Add record
    pub fn add(target_id: DocumentId, resolver_tag: ResolverTag) -> Self {
        Self::new(target_id, resolver_tag, OperationKind::Add)
    }

    /// Modify record
    pub fn modify(target_id: DocumentId, resolver_tag: ResolverTag) -> Self {
        Self::new(target_id, resolver_tag, OperationKind::Modify)
    }

    /// Delete record
    pub fn delete(target_id: DocumentId, resolver_tag: ResolverTag) -> Self {
        Self::new(target_id, resolver_tag, OperationKind::Delete)
    }

    /// Document id in the index; also the dedupe key
    #[inline]
    pub fn document_id(&self) -> &DocumentId {
        &self.target_id
    }

    /// Merge rank of this record's kind
    #[inline]
    pub fn rank(&self) -> u8 {
        self.kind.rank()
    }
}

impl fmt::Display for OperationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.target_id, self.resolver_tag)
    }
}
