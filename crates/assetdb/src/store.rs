//! Asset store trait and SQLite implementation.

use crate::error::{AssetDbError, AssetDbResult};
use crate::repos::AssetRepo;
use crate::schema::{self, Dialect};
use crate::ACCESS_REFRESH_THRESHOLD;
use async_trait::async_trait;
use depot_core::{Clock, MIN_PAYLOAD_LIMIT};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Combined asset store trait.
#[async_trait]
pub trait AssetStore: AssetRepo + Send + Sync {
    /// Apply the schema migration ledger.
    ///
    /// Any step failure is fatal: the store must not be used against a
    /// partially migrated schema.
    async fn migrate(&self) -> AssetDbResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> AssetDbResult<()>;

    /// Collect non-fatal configuration warnings, e.g. a backend payload
    /// limit below the 128 MiB minimum the store expects.
    async fn verify_backend(&self) -> AssetDbResult<Vec<String>>;
}

/// SQLite-based asset store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Create a new SQLite store and bring its schema up to date.
    pub async fn new(
        path: impl AsRef<Path>,
        busy_timeout_secs: Option<u64>,
        clock: Arc<dyn Clock>,
    ) -> AssetDbResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AssetDbError::Config(format!("creating {}: {e}", parent.display())))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(|e| AssetDbError::Config(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(busy_timeout_secs.unwrap_or(5)));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under concurrent callers.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool, clock };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Best-effort access-time refresh, issued only past the staleness
    /// threshold. Independent of the calling read: failure is logged and
    /// swallowed.
    async fn refresh_if_stale(&self, id: uuid::Uuid, access_time: time::OffsetDateTime) {
        let now = self.clock.now();
        if now - access_time <= ACCESS_REFRESH_THRESHOLD {
            return;
        }
        let result = sqlx::query("UPDATE asset_refs SET access_time = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await;
        if let Err(error) = result {
            tracing::warn!(asset_id = %id, %error, "failed to refresh access time");
        }
    }

    /// The two-row dedup write, in one transaction. Content row first so
    /// the reference row's `(hash, asset_type)` pointer always resolves.
    async fn store_prepared(&self, asset: &crate::prepared::PreparedAsset) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;

        // Loser of a concurrent race for the same content sees a no-op,
        // never an error, and the existing payload is never overwritten.
        sqlx::query(
            r#"
            INSERT INTO asset_content (hash, asset_type, data)
            VALUES (?, ?, ?)
            ON CONFLICT(hash, asset_type) DO NOTHING
            "#,
        )
        .bind(&asset.hash)
        .bind(asset.asset_type)
        .bind(asset.data.as_ref())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO asset_refs (
                id, name, asset_type, temporary, create_time, access_time,
                flags, creator_id, hash
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id)
        .bind(&asset.name)
        .bind(asset.asset_type)
        .bind(asset.temporary)
        .bind(asset.create_time)
        .bind(asset.access_time)
        .bind(asset.flags)
        .bind(asset.creator_id)
        .bind(&asset.hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }
}

#[async_trait]
impl AssetStore for SqliteStore {
    async fn migrate(&self) -> AssetDbResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS table_revisions (
                table_name TEXT PRIMARY KEY,
                revision INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AssetDbError::Migration(format!("creating revision table: {e}")))?;

        let stored: Vec<(String, i64)> =
            sqlx::query_as("SELECT table_name, revision FROM table_revisions")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AssetDbError::Migration(format!("reading revision table: {e}")))?;
        let stored: HashMap<String, u32> = stored
            .into_iter()
            .map(|(name, revision)| (name, revision as u32))
            .collect();

        for plan in schema::plan(schema::ASSET_LEDGER, &stored, Dialect::Sqlite)? {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| AssetDbError::Migration(format!("{}: {e}", plan.table)))?;
            for statement in &plan.statements {
                sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                    AssetDbError::Migration(format!("{}: {statement}: {e}", plan.table))
                })?;
            }
            sqlx::query(
                "INSERT INTO table_revisions (table_name, revision) VALUES (?, ?)
                 ON CONFLICT(table_name) DO UPDATE SET revision = excluded.revision",
            )
            .bind(plan.table)
            .bind(i64::from(plan.target_revision))
            .execute(&mut *tx)
            .await
            .map_err(|e| AssetDbError::Migration(format!("{}: {e}", plan.table)))?;
            tx.commit()
                .await
                .map_err(|e| AssetDbError::Migration(format!("{}: {e}", plan.table)))?;

            tracing::info!(
                table = plan.table,
                from_revision = plan.from_revision,
                to_revision = plan.target_revision,
                "schema migrated"
            );
        }

        Ok(())
    }

    async fn health_check(&self) -> AssetDbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn verify_backend(&self) -> AssetDbResult<Vec<String>> {
        let mut warnings = Vec::new();

        // SQLITE_MAX_LENGTH bounds any single stored value. Probe it with a
        // zeroblob of the minimum payload size; the blob is never
        // materialized into a row.
        let probe: sqlx::Result<i64> = sqlx::query_scalar("SELECT length(zeroblob(?))")
            .bind(MIN_PAYLOAD_LIMIT as i64)
            .fetch_one(&self.pool)
            .await;
        if let Err(error) = probe {
            warnings.push(format!(
                "backend rejects payloads of {} bytes; rebuild SQLite with a larger \
                 SQLITE_MAX_LENGTH or switch to PostgreSQL ({error})",
                MIN_PAYLOAD_LIMIT
            ));
        }

        Ok(warnings)
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::{AssetJoinRow, AssetRefRow};
    use crate::prepared::prepare;
    use crate::repos::assets::payload_stream;
    use crate::repos::PayloadStream;
    use depot_core::{Asset, AssetMetadata, NewAsset};
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl AssetRepo for SqliteStore {
        async fn exists(&self, id: Uuid) -> AssetDbResult<bool> {
            let row: Option<(OffsetDateTime,)> =
                sqlx::query_as("SELECT access_time FROM asset_refs WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            match row {
                Some((access_time,)) => {
                    self.refresh_if_stale(id, access_time).await;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn exists_batch(&self, ids: &[Uuid]) -> AssetDbResult<HashMap<Uuid, bool>> {
            let mut result: HashMap<Uuid, bool> = ids.iter().map(|id| (*id, false)).collect();
            if ids.is_empty() {
                return Ok(result);
            }

            // SQLite has a limit of ~999 parameters, so we batch if needed
            const BATCH_SIZE: usize = 900;

            for batch in ids.chunks(BATCH_SIZE) {
                let placeholders: Vec<&str> = batch.iter().map(|_| "?").collect();
                let query = format!(
                    "SELECT id, access_time FROM asset_refs WHERE id IN ({})",
                    placeholders.join(", ")
                );

                let mut query_builder = sqlx::query_as::<_, (Uuid, OffsetDateTime)>(&query);
                for id in batch {
                    query_builder = query_builder.bind(id);
                }

                let rows = query_builder.fetch_all(&self.pool).await?;
                for (id, access_time) in rows {
                    result.insert(id, true);
                    self.refresh_if_stale(id, access_time).await;
                }
            }

            Ok(result)
        }

        async fn get(&self, id: Uuid) -> AssetDbResult<Option<Asset>> {
            let row = sqlx::query_as::<_, AssetJoinRow>(
                r#"
                SELECT r.id, r.name, r.asset_type, r.temporary, r.create_time,
                       r.access_time, r.flags, r.creator_id, c.data
                FROM asset_refs r
                INNER JOIN asset_content c
                    ON r.hash = c.hash AND r.asset_type = c.asset_type
                WHERE r.id = ?
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some(row) => {
                    let access_time = row.access_time;
                    let asset = row.into_asset()?;
                    self.refresh_if_stale(id, access_time).await;
                    Ok(Some(asset))
                }
                None => Ok(None),
            }
        }

        async fn get_metadata(&self, id: Uuid) -> AssetDbResult<Option<AssetMetadata>> {
            let row = sqlx::query_as::<_, AssetRefRow>("SELECT * FROM asset_refs WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            row.map(AssetRefRow::into_metadata).transpose()
        }

        async fn get_payload(&self, id: Uuid) -> AssetDbResult<Option<PayloadStream>> {
            let data: Option<Vec<u8>> = sqlx::query_scalar(
                r#"
                SELECT c.data
                FROM asset_refs r
                INNER JOIN asset_content c
                    ON r.hash = c.hash AND r.asset_type = c.asset_type
                WHERE r.id = ?
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(data.map(payload_stream))
        }

        async fn store(&self, asset: NewAsset) -> AssetDbResult<()> {
            let prepared = prepare(asset, self.clock.now());
            let id = prepared.id;
            match self.store_prepared(&prepared).await {
                Ok(()) => Ok(()),
                Err(error) => {
                    tracing::warn!(asset_id = %id, %error, "asset store transaction failed");
                    Err(AssetDbError::StoreFailed(id))
                }
            }
        }

        async fn delete(&self, id: Uuid) -> AssetDbResult<()> {
            // Zero flags mark the asset protected; absent and protected rows
            // alike match nothing and the delete silently succeeds.
            sqlx::query("DELETE FROM asset_refs WHERE id = ? AND flags <> 0")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }
    }
}
