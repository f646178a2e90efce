//! Persistence gateway error types.

use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Unique or foreign-key constraint rejected a write
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// A stored value could not be mapped back onto a model
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Storage fault reported by a non-SQL backend
    #[error("Storage fault: {0}")]
    Fault(String),
}

/// Result type for gateway operations
pub type StoreResult<T> = Result<T, StoreError>;
