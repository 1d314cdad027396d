//! Common test utilities and fixtures.

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use depot_assetdb::{AssetDbResult, AssetStore, SqliteStore};
use depot_core::ManualClock;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tempfile::TempDir;

/// A test asset store over a fresh on-disk SQLite database, with a
/// manually advanced clock. The database is removed on drop.
pub struct TestStore {
    pub store: Arc<SqliteStore>,
    pub clock: Arc<ManualClock>,
    _temp_dir: TempDir,
}

impl TestStore {
    pub async fn new() -> AssetDbResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("assets.db");
        let clock = Arc::new(ManualClock::new(fixtures::test_epoch()));
        let store = SqliteStore::new(&db_path, None, clock.clone()).await?;

        Ok(Self {
            store: Arc::new(store),
            clock,
            _temp_dir: temp_dir,
        })
    }

    /// The store as a trait object, as embedding code would hold it.
    #[allow(dead_code)]
    pub fn store(&self) -> Arc<dyn AssetStore> {
        self.store.clone()
    }

    /// Raw pool access for schema-level assertions.
    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.store.pool()
    }
}
