//! Host transaction with two-phase commit
//!
//! A small transaction implementation that drives joined participants
//! through vote / finish / abort. It exists so the pipeline can run
//! standalone; applications embedding the pipeline in another transaction
//! system implement `TransactionHandle` on their own type instead.

use crate::manager::TransactionMetricsInner;
use crate::participant::{TransactionHandle, TransactionParticipant};
use scribe_core::{ContextId, ScribeError, ScribeResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Voting` (begin commit)
/// - `Voting` → `Committed` (every participant voted yes)
/// - `Voting` → `Aborted` (a participant refused)
/// - `Active` → `Aborted` (explicit abort or drop)
///
/// Terminal states (no transitions allowed):
/// - `Committed`
/// - `Aborted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing; participants may join
    Active,
    /// Participants are voting
    Voting,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

impl TransactionStatus {
    fn label(&self) -> String {
        match self {
            TransactionStatus::Active => "active".to_string(),
            TransactionStatus::Voting => "voting".to_string(),
            TransactionStatus::Committed => "committed".to_string(),
            TransactionStatus::Aborted { reason } => format!("aborted: {}", reason),
        }
    }
}

/// One logical unit of work
///
/// Dropping an active transaction aborts it.
pub struct Transaction {
    id: ContextId,
    status: TransactionStatus,
    participants: Vec<Box<dyn TransactionParticipant>>,
    metrics: Option<Arc<TransactionMetricsInner>>,
}

impl Transaction {
    /// Create a transaction without metrics
    ///
    /// Context ids must be unique among live transactions, or their
    /// buffers merge; outside this crate use `TransactionManager::begin`.
    pub(crate) fn new(id: ContextId) -> Self {
        Self {
            id,
            status: TransactionStatus::Active,
            participants: Vec::new(),
            metrics: None,
        }
    }

    pub(crate) fn with_metrics(id: ContextId, metrics: Arc<TransactionMetricsInner>) -> Self {
        Self {
            id,
            status: TransactionStatus::Active,
            participants: Vec::new(),
            metrics: Some(metrics),
        }
    }

    /// Context token of this transaction
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Current status
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Whether the transaction still accepts work
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Whether the transaction committed
    pub fn is_committed(&self) -> bool {
        self.status == TransactionStatus::Committed
    }

    /// Whether the transaction aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Number of joined participants
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    fn ensure_active(&self) -> ScribeResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ScribeError::TransactionNotActive {
                state: self.status.label(),
            })
        }
    }

    /// Commit: collect votes, then finish every participant
    ///
    /// If any participant votes no, every participant is aborted and the
    /// vote error is returned as `TransactionAborted`.
    pub fn commit(&mut self) -> ScribeResult<()> {
        self.ensure_active()?;
        self.status = TransactionStatus::Voting;

        let mut participants = std::mem::take(&mut self.participants);
        participants.sort_by_key(|p| p.sort_key());

        let vote = participants
            .iter_mut()
            .try_for_each(|participant| participant.tpc_vote());

        if let Err(e) = vote {
            warn!(target: "scribe::txn", txn = %self.id, error = %e, "Vote failed, aborting");
            let reason = e.to_string();
            for participant in participants.iter_mut() {
                participant.on_abort();
            }
            self.status = TransactionStatus::Aborted {
                reason: reason.clone(),
            };
            self.record_abort();
            return Err(ScribeError::TransactionAborted { reason });
        }

        self.status = TransactionStatus::Committed;
        for participant in participants.iter_mut() {
            participant.on_commit();
        }
        self.record_commit();
        debug!(target: "scribe::txn", txn = %self.id, participants = participants.len(), "Transaction committed");
        Ok(())
    }

    /// Abort and notify every participant
    pub fn abort(&mut self, reason: impl Into<String>) -> ScribeResult<()> {
        self.ensure_active()?;
        self.abort_inner(reason.into());
        Ok(())
    }

    fn abort_inner(&mut self, reason: String) {
        let mut participants = std::mem::take(&mut self.participants);
        participants.sort_by_key(|p| p.sort_key());
        for participant in participants.iter_mut() {
            participant.on_abort();
        }
        debug!(target: "scribe::txn", txn = %self.id, reason = %reason, "Transaction aborted");
        self.status = TransactionStatus::Aborted { reason };
        self.record_abort();
    }

    fn record_commit(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_commit();
        }
    }

    fn record_abort(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_abort();
        }
    }
}

impl TransactionHandle for Transaction {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn join(&mut self, participant: Box<dyn TransactionParticipant>) -> ScribeResult<()> {
        self.ensure_active()?;
        self.participants.push(participant);
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_active() {
            self.abort_inner("dropped without commit".to_string());
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("participants", &self.participants.len())
            .finish()
    }
}
