//! Error types for the indexing pipeline
//!
//! A single hierarchy covers every layer: enqueue-time identifier
//! failures that surface to producers, worker-time failures that are
//! only ever logged, and lifecycle misuse of the worker.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type ScribeResult<T> = std::result::Result<T, ScribeError>;

/// Error types for the indexing pipeline
#[derive(Debug, Error)]
pub enum ScribeError {
    /// The resolver could not produce an identifier for an object
    ///
    /// Raised synchronously to the producer, before any buffering.
    #[error("Key not found: {object}")]
    IdentifierNotFound {
        /// Debug rendering of the object that had no identifier
        object: String,
    },

    /// No resolver is registered under the requested tag
    #[error("No resolver registered for tag '{tag}'")]
    UnknownResolver {
        /// Requested resolver tag (empty means the default resolver)
        tag: String,
    },

    /// The resolver returned nothing for a recorded identifier
    #[error("Could not resolve document '{document_id}'")]
    Unresolved {
        /// Identifier that failed to resolve
        document_id: String,
    },

    /// No document builder is registered for an object kind
    #[error("No document builder for object kind '{kind}'")]
    NoBuilder {
        /// Object kind reported by the resolved object
        kind: String,
    },

    /// The index backend rejected an operation
    #[error("Index error: {message}")]
    Index {
        /// Backend-provided detail
        message: String,
    },

    /// `start` was called on a worker that is already running
    #[error("Indexer already running")]
    WorkerAlreadyRunning,

    /// A transaction was used after it reached a terminal state
    #[error("Transaction not active (state: {state})")]
    TransactionNotActive {
        /// State the transaction was found in
        state: String,
    },

    /// A participant refused to commit; every participant was aborted
    #[error("Transaction aborted: {reason}")]
    TransactionAborted {
        /// Why the vote failed
        reason: String,
    },

    /// Caller supplied an invalid argument
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// I/O error (index files, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Detail
        message: String,
    },
}

impl ScribeError {
    /// Identifier lookup failed for `object`
    pub fn identifier_not_found(object: impl Into<String>) -> Self {
        ScribeError::IdentifierNotFound {
            object: object.into(),
        }
    }

    /// Resolution of `document_id` returned nothing
    pub fn unresolved(document_id: impl Into<String>) -> Self {
        ScribeError::Unresolved {
            document_id: document_id.into(),
        }
    }

    /// Index backend failure
    pub fn index(message: impl Into<String>) -> Self {
        ScribeError::Index {
            message: message.into(),
        }
    }

    /// Invalid caller input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ScribeError::InvalidInput {
            message: message.into(),
        }
    }

    /// Configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        ScribeError::Config {
            message: message.into(),
        }
    }

    /// Internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        ScribeError::Internal {
            message: message.into(),
        }
    }

    /// Whether this error means the target object could not be found
    ///
    /// Only these failures are eligible for the requeue-once policy.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, ScribeError::Unresolved { .. })
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(e: serde_json::Error) -> Self {
        ScribeError::Serialization(e.to_string())
    }
}
