//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! [`TextStore`] implementation backed by the `text_entries` table.
//!
//! Every row is unique on `(scope, key)`. Page rows use the page id as
//! scope and shared rows use the `__shared__` sentinel.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};
use vitrine_core::{
    ContentError, ContentResult, FlatEntry, LocalizedText, Scope, StoreError, Timestamp,
    WriteBatch,
};
use vitrine_storage::TextStore;

// ============================================================================
// SCHEMA
// ============================================================================

/// DDL applied by [`DbClient::ensure_schema`]. Idempotent.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS text_entries (
    scope       TEXT        NOT NULL,
    key         TEXT        NOT NULL,
    value       JSONB       NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (scope, key)
);
"#;

const SELECT_COLUMNS: &str = "SELECT scope, key, value, created_at, updated_at FROM text_entries";

const UPSERT_SQL: &str = "INSERT INTO text_entries (scope, key, value, created_at, updated_at) \
     VALUES ($1, $2, $3, now(), now()) \
     ON CONFLICT (scope, key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()";

const DELETE_SQL: &str = "DELETE FROM text_entries WHERE scope = $1 AND key = $2";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait timeout when acquiring a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "vitrine".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("VITRINE_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("VITRINE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("VITRINE_DB_NAME").unwrap_or_else(|_| "vitrine".to_string()),
            user: std::env::var("VITRINE_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("VITRINE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("VITRINE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("VITRINE_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// PostgreSQL-backed text store.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the `text_entries` table if it does not exist.
    pub async fn ensure_schema(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA_SQL).await?;
        tracing::info!("text_entries schema ready");
        Ok(())
    }

    async fn store_conn(&self) -> ContentResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    async fn query_entries(
        &self,
        operation: &'static str,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> ContentResult<Vec<FlatEntry>> {
        let conn = self.store_conn().await?;
        let rows = conn
            .query(sql, params)
            .await
            .map_err(|e| query_failed(operation, e))?;
        rows.iter().map(row_to_entry).collect()
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn row_to_entry(row: &Row) -> ContentResult<FlatEntry> {
    let scope: String = row
        .try_get("scope")
        .map_err(|e| query_failed("decode_row", e))?;
    let key: String = row.try_get("key").map_err(|e| query_failed("decode_row", e))?;
    let value: JsonValue = row
        .try_get("value")
        .map_err(|e| query_failed("decode_row", e))?;
    let created_at: Timestamp = row
        .try_get("created_at")
        .map_err(|e| query_failed("decode_row", e))?;
    let updated_at: Timestamp = row
        .try_get("updated_at")
        .map_err(|e| query_failed("decode_row", e))?;

    let value: LocalizedText =
        serde_json::from_value(value).map_err(|e| StoreError::CorruptRow {
            scope: scope.clone(),
            key: key.clone(),
            reason: e.to_string(),
        })?;

    Ok(FlatEntry {
        scope: Scope::from(scope),
        key,
        value,
        created_at,
        updated_at,
    })
}

fn query_failed(operation: &str, err: tokio_postgres::Error) -> ContentError {
    tracing::error!(operation, "Database error: {:?}", err);
    StoreError::QueryFailed {
        operation: operation.to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn pool_error(err: PoolError) -> ContentError {
    tracing::error!("Connection pool error: {:?}", err);
    StoreError::Unavailable {
        reason: err.to_string(),
    }
    .into()
}

// ============================================================================
// TEXT STORE IMPLEMENTATION
// ============================================================================

#[async_trait]
impl TextStore for DbClient {
    async fn fetch_scopes(&self, scopes: &[Scope]) -> ContentResult<Vec<FlatEntry>> {
        let names: Vec<String> = scopes.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!("{} WHERE scope = ANY($1)", SELECT_COLUMNS);
        self.query_entries("fetch_scopes", &sql, &[&names]).await
    }

    async fn fetch_all(&self) -> ContentResult<Vec<FlatEntry>> {
        self.query_entries("fetch_all", SELECT_COLUMNS, &[]).await
    }

    async fn list_scopes(&self) -> ContentResult<Vec<Scope>> {
        let conn = self.store_conn().await?;
        let rows = conn
            .query("SELECT DISTINCT scope FROM text_entries ORDER BY scope", &[])
            .await
            .map_err(|e| query_failed("list_scopes", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map(Scope::from)
                    .map_err(|e| query_failed("list_scopes", e))
            })
            .collect()
    }

    async fn write_batch(&self, batch: &WriteBatch) -> ContentResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut conn = self.store_conn().await?;
        let tx = conn.transaction().await.map_err(transaction_failed)?;

        let mut touched = 0usize;
        for entry in &batch.deletes {
            let removed = tx
                .execute(DELETE_SQL, &[&entry.scope.as_str(), &entry.key])
                .await
                .map_err(transaction_failed)?;
            touched += removed as usize;
        }
        for write in &batch.upserts {
            let value = write.value.to_json();
            tx.execute(UPSERT_SQL, &[&write.scope.as_str(), &write.key, &value])
                .await
                .map_err(transaction_failed)?;
            touched += 1;
        }

        // Dropping an uncommitted transaction rolls it back.
        tx.commit().await.map_err(transaction_failed)?;

        tracing::debug!(
            upserts = batch.upserts.len(),
            deletes = batch.deletes.len(),
            touched,
            "Committed text entry batch"
        );
        Ok(touched)
    }

    async fn health_check(&self) -> ContentResult<()> {
        let conn = self.store_conn().await?;
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(|e| query_failed("health_check", e))?;
        Ok(())
    }
}

fn transaction_failed(err: tokio_postgres::Error) -> ContentError {
    tracing::error!("Transaction error: {:?}", err);
    StoreError::TransactionFailed {
        reason: err.to_string(),
    }
    .into()
}
