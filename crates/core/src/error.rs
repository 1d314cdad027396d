//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("unknown asset type code: {0}")]
    InvalidAssetType(i32),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
