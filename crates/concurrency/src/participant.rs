//! Two-phase-commit participation interface
//!
//! The buffer layer depends only on these two traits, never on a concrete
//! transaction manager. Any host transaction system that can call
//! `on_commit` exactly once after a successful commit and `on_abort`
//! exactly once after an abort can drive the pipeline.

use scribe_core::{ContextId, ScribeResult};

/// A resource that joins a transaction and reacts to its outcome
///
/// Call sequence for one transaction:
///
/// ```text
/// commit:  tpc_vote() ... on_commit()
/// abort:   on_abort()              (at any phase, including after a failed vote)
/// ```
pub trait TransactionParticipant: Send {
    /// Stable ordering key; participants are driven in ascending key order
    fn sort_key(&self) -> String;

    /// Second phase vote
    ///
    /// Returning an error aborts the whole transaction. Passive voters
    /// keep the default.
    fn tpc_vote(&mut self) -> ScribeResult<()> {
        Ok(())
    }

    /// The transaction committed
    fn on_commit(&mut self);

    /// The transaction aborted
    fn on_abort(&mut self);
}

/// The part of a host transaction the pipeline needs
pub trait TransactionHandle {
    /// Token identifying this transaction's execution context
    ///
    /// Must be unique among transactions that are active at the same time;
    /// buffers are keyed by it.
    fn context_id(&self) -> ContextId;

    /// Register a participant for this transaction's outcome
    ///
    /// # Errors
    /// Fails if the transaction is no longer active.
    fn join(&mut self, participant: Box<dyn TransactionParticipant>) -> ScribeResult<()>;
}
