//! PostgreSQL-based asset store implementation.

use crate::error::{AssetDbError, AssetDbResult};
use crate::models::{AssetJoinRow, AssetRefRow};
use crate::prepared::prepare;
use crate::repos::assets::payload_stream;
use crate::repos::{AssetRepo, PayloadStream};
use crate::schema::{self, Dialect};
use crate::store::AssetStore;
use crate::ACCESS_REFRESH_THRESHOLD;
use async_trait::async_trait;
use depot_core::{Asset, AssetMetadata, Clock, NewAsset};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL-based asset store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
    clock: Arc<dyn Clock>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL and bring its
    /// schema up to date.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
        clock: Arc<dyn Clock>,
    ) -> AssetDbResult<Self> {
        let mut opts =
            PgConnectOptions::from_str(url).map_err(|e| AssetDbError::Config(e.to_string()))?;

        // Bound hung queries server-side if configured.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool, clock };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Best-effort access-time refresh, issued only past the staleness
    /// threshold. Independent of the calling read: failure is logged and
    /// swallowed.
    async fn refresh_if_stale(&self, id: Uuid, access_time: OffsetDateTime) {
        let now = self.clock.now();
        if now - access_time <= ACCESS_REFRESH_THRESHOLD {
            return;
        }
        let result = sqlx::query("UPDATE asset_refs SET access_time = $1 WHERE id = $2")
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

        sqlx::query(
            r#"
            INSERT INTO asset_content (hash, asset_type, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (hash, asset_type) DO NOTHING
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
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
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
impl AssetStore for PostgresStore {
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

        for plan in schema::plan(schema::ASSET_LEDGER, &stored, Dialect::Postgres)? {
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
                "INSERT INTO table_revisions (table_name, revision) VALUES ($1, $2)
                 ON CONFLICT (table_name) DO UPDATE SET revision = excluded.revision",
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
        // A bytea value caps at 1 GiB, comfortably above the 128 MiB
        // payload minimum; only connectivity is worth probing here.
        self.health_check().await?;
        Ok(Vec::new())
    }
}

#[async_trait]
impl AssetRepo for PostgresStore {
    async fn exists(&self, id: Uuid) -> AssetDbResult<bool> {
        let row: Option<(OffsetDateTime,)> =
            sqlx::query_as("SELECT access_time FROM asset_refs WHERE id = $1")
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

        // One round-trip per 900 identifiers, not one per identifier.
        const BATCH_SIZE: usize = 900;

        for batch in ids.chunks(BATCH_SIZE) {
            let placeholders: Vec<String> =
                (1..=batch.len()).map(|i| format!("${i}")).collect();
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
            WHERE r.id = $1
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
        let row = sqlx::query_as::<_, AssetRefRow>("SELECT * FROM asset_refs WHERE id = $1")
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
            WHERE r.id = $1
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
        sqlx::query("DELETE FROM asset_refs WHERE id = $1 AND flags <> 0")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
