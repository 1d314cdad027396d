//! Asset store error types.

use thiserror::Error;
use uuid::Uuid;

/// Asset store operation errors.
#[derive(Debug, Error)]
pub enum AssetDbError {
    /// The identifier has no reference row.
    ///
    /// Lookups return `Option` for misses; this variant exists for callers
    /// that need to turn a miss into an error with the identifier attached.
    #[error("asset not found: {0}")]
    NotFound(Uuid),

    /// The two-row store transaction failed; nothing was persisted for this
    /// identifier.
    #[error("failed to store asset: {0}")]
    StoreFailed(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration step failed. Fatal at startup: the service must
    /// not run against a partially migrated schema.
    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// A persisted row violates the data model (bad hash width, unknown
    /// type code).
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for asset store operations.
pub type AssetDbResult<T> = std::result::Result<T, AssetDbError>;
