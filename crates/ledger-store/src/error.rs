use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors that can occur when reading from or committing to the ledger store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stream moved past the version a transaction was decided against.
    #[error(
        "Concurrency conflict on stream {stream_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        stream_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The transaction is malformed (empty, duplicate streams, version gaps).
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for optimistic concurrency failures.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for ledger store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
