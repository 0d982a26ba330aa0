//! Per-transaction aggregation of operation records
//!
//! A `TransactionBuffer` belongs to exactly one transaction context and is
//! never shared, so it carries no locks. It keeps at most one record per
//! document id, merging new records against the stored one.
//!
//! ## Merge table
//!
//! Ranks: Delete (2) > Add (1) > Modify (0).
//!
//! | stored | new    | result            |
//! |--------|--------|-------------------|
//! | none   | any    | new               |
//! | Add    | Delete | nothing (removed) |
//! | higher | lower  | stored            |
//! | lower/equal | higher/equal | new  |

use crate::queue::IndexQueue;
use scribe_core::{DocumentId, OperationKind, OperationRecord};
use std::collections::HashMap;

/// What `TransactionBuffer::add` did with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No record existed for the id; the new one was stored
    Inserted,
    /// The new record replaced the stored one
    Replaced,
    /// The stored record outranks the new one and was kept
    KeptExisting,
    /// Add followed by Delete: the id was dropped from the buffer
    Cancelled,
}

/// Choose the surviving record for one document id
///
/// Returns `None` when the pair cancels out (Add then Delete).
pub fn choose(previous: OperationRecord, new: OperationRecord) -> (Option<OperationRecord>, MergeOutcome) {
    if previous.kind == OperationKind::Add && new.kind == OperationKind::Delete {
        return (None, MergeOutcome::Cancelled);
    }
    if previous.rank() > new.rank() {
        (Some(previous), MergeOutcome::KeptExisting)
    } else {
        (Some(new), MergeOutcome::Replaced)
    }
}

/// Operation records of one transaction, deduplicated by document id
#[derive(Debug, Default)]
pub struct TransactionBuffer {
    ops: HashMap<DocumentId, OperationRecord>,
    registered: bool,
}

impl TransactionBuffer {
    /// Create an empty, unregistered buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `op` into the buffer
    pub fn add(&mut self, op: OperationRecord) -> MergeOutcome {
        match self.ops.remove(op.document_id()) {
            None => {
                self.ops.insert(op.document_id().clone(), op);
                MergeOutcome::Inserted
            }
            Some(previous) => {
                let (survivor, outcome) = choose(previous, op);
                if let Some(record) = survivor {
                    self.ops.insert(record.document_id().clone(), record);
                }
                outcome
            }
        }
    }

    /// Whether a commit coordinator has been registered for this buffer
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Record that a commit coordinator was registered
    pub fn mark_registered(&mut self) {
        self.registered = true;
    }

    /// Stored record for `id`
    pub fn get(&self, id: &DocumentId) -> Option<&OperationRecord> {
        self.ops.get(id)
    }

    /// Iterate over stored records in unspecified order
    pub fn records(&self) -> impl Iterator<Item = &OperationRecord> {
        self.ops.values()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether no records are stored
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Move every stored record into `queue` and reset the buffer
    ///
    /// Returns the number of records enqueued.
    pub fn flush(&mut self, queue: &IndexQueue) -> usize {
        let ops = std::mem::take(&mut self.ops);
        self.registered = false;
        queue.push_all(ops.into_values())
    }

    /// Drop every stored record without enqueuing and reset the buffer
    ///
    /// Returns the number of records dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.ops.len();
        self.ops.clear();
        self.registered = false;
        dropped
    }
}
