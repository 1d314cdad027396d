//! Core domain types for the depot asset store.
//!
//! This crate defines the canonical data model used by the storage engine:
//! - Content hashes forming the physical dedup key
//! - Asset records, types, and flags
//! - Clock capability for time-dependent policies
//! - Backend configuration

pub mod asset;
pub mod clock;
pub mod config;
pub mod error;
pub mod hash;

pub use asset::{Asset, AssetFlags, AssetMetadata, AssetType, NewAsset, MAX_ASSET_NAME};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AssetDbConfig;
pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher};

/// Minimum backend payload size the store expects to be able to write: 128 MiB.
///
/// Backends whose per-value limit falls below this report a configuration
/// warning at startup instead of failing on the first large asset.
pub const MIN_PAYLOAD_LIMIT: u64 = 128 * 1024 * 1024;
