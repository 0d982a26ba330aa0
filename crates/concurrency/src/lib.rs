//! Concurrency layer for Scribe
//!
//! This crate implements the producer side of the pipeline:
//! - TransactionBuffer: per-transaction merge/dedupe of operation records
//! - CommitCoordinator / BufferRegistry: flush on commit, discard on abort
//! - IndexQueue: process-wide FIFO feeding the index worker
//! - Transaction / TransactionManager: a standalone two-phase host transaction
//!
//! The buffer layer only depends on the `TransactionParticipant` and
//! `TransactionHandle` traits, so any host transaction system can drive it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod coordinator;
pub mod manager;
pub mod participant;
pub mod queue;
pub mod transaction;

pub use buffer::{choose, MergeOutcome, TransactionBuffer};
pub use coordinator::{BufferRegistry, CommitCoordinator};
pub use manager::{TransactionManager, TransactionMetrics};
pub use participant::{TransactionHandle, TransactionParticipant};
pub use queue::IndexQueue;
pub use transaction::{Transaction, TransactionStatus};
