//! Deduplicating asset store engine.
//!
//! This crate provides the asset backend's storage core:
//! - A reference table owning logical asset identity and metadata
//! - A content table holding each distinct payload exactly once,
//!   keyed by content digest and asset type
//! - The dedup write path linking the two in one transaction
//! - Read paths with a staleness-gated access-time refresh
//! - A declarative, revision-checkpointed schema migration ledger

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod schema;
pub mod store;

mod prepared;

pub use error::{AssetDbError, AssetDbResult};
pub use postgres::PostgresStore;
pub use repos::{AssetRepo, PayloadStream};
pub use store::{AssetStore, SqliteStore};

use depot_core::{AssetDbConfig, Clock};
use std::sync::Arc;

/// Reads older than this refresh the reference row's access time.
///
/// Refreshing on every read would rewrite metadata constantly; the
/// threshold keeps the recency signal usable for external retention
/// policies without the write amplification.
pub const ACCESS_REFRESH_THRESHOLD: time::Duration = time::Duration::hours(1);

/// Create an asset store from configuration.
pub async fn from_config(
    config: &AssetDbConfig,
    clock: Arc<dyn Clock>,
) -> AssetDbResult<Arc<dyn AssetStore>> {
    match config {
        AssetDbConfig::Sqlite {
            path,
            busy_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *busy_timeout_secs, clock).await?;
            Ok(Arc::new(store) as Arc<dyn AssetStore>)
        }
        AssetDbConfig::Postgres {
            url,
            max_connections,
            statement_timeout_ms,
        } => {
            let store =
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms, clock)
                    .await?;
            Ok(Arc::new(store) as Arc<dyn AssetStore>)
        }
    }
}
