//! Error types for tristore.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific error conditions and provides clear error messages.

use std::path::PathBuf;

use thiserror::Error;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required triple component was not supplied to the builder.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// An IRI was constructed from an empty string.
    #[error("IRI cannot be empty")]
    EmptyIri,
}

/// Storage errors raised by the externalizing store's blob directory.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path of the file or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A reference IRI points at a blob that does not exist on disk.
    #[error("No stored literal for hash {hash}")]
    MissingBlob {
        /// Lowercase hex content hash.
        hash: String,
    },

    /// A stored blob does not contain the `datatype^^lexical` layout.
    #[error("Stored literal {hash} is malformed")]
    MalformedBlob {
        /// Lowercase hex content hash.
        hash: String,
    },

    /// An IRI using the replacement scheme could not be parsed.
    #[error("Invalid literal reference: {iri}")]
    BadReference {
        /// The offending IRI.
        iri: String,
    },
}

/// Top-level error type for tristore.
///
/// This enum encompasses all possible errors that can occur when using
/// a triple store.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The externalizing store's blob directory failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A snapshot cursor was invalidated by a concurrent structural change.
    ///
    /// Recoverable: call `filter` again to obtain a fresh snapshot.
    #[error("Graph was structurally modified during iteration")]
    ConcurrentModification,

    /// An internal lock was poisoned by a panicking thread.
    #[error("Poisoned lock: {context}")]
    LockPoisoned {
        /// Which lock was poisoned.
        context: &'static str,
    },
}

impl GraphError {
    /// Creates a lock-poisoning error for the given context.
    #[must_use]
    pub const fn poisoned(context: &'static str) -> Self {
        Self::LockPoisoned { context }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if a retry of the failed operation may succeed.
    ///
    /// Only cursor invalidation is retryable: repeating the `filter` call
    /// yields a fresh, valid snapshot.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

/// Result type alias for tristore operations.
pub type GraphResult<T> = Result<T, GraphError>;
