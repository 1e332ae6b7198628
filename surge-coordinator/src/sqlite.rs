use crate::config::PoolConfig;
use crate::error::StoreError;
use crate::pool::{Backend, Transaction, WorkRecord};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS work_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id TEXT NOT NULL,
    processed_at_ms INTEGER NOT NULL,
    external_duration_ms INTEGER NOT NULL
)";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite storage for [WorkRecord]s.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Connect and create the `work_records` table if it does not exist yet.
    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .min_connections(config.min)
            .max_connections(config.max)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.idle_timeout)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;
        info!(
            "Connected to {url} (min={}, max={})",
            config.min, config.max
        );

        Ok(Self { pool })
    }

    /// Number of committed work records.
    pub async fn record_count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM work_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

impl Backend for SqliteBackend {
    type Tx = SqliteTx;

    async fn begin(&self) -> Result<SqliteTx, StoreError> {
        Ok(SqliteTx(self.pool.begin().await?))
    }

    fn idle(&self) -> u32 {
        self.pool.num_idle() as u32
    }

    fn size(&self) -> u32 {
        self.pool.size()
    }
}

pub struct SqliteTx(sqlx::Transaction<'static, Sqlite>);

impl Transaction for SqliteTx {
    async fn insert(&mut self, record: &WorkRecord) -> Result<(), StoreError> {
        let processed_at_ms = (record.processed_at.unix_timestamp_nanos() / 1_000_000) as i64;
        let external_duration_ms = record.external_duration.as_millis() as i64;

        sqlx::query(
            "INSERT INTO work_records (request_id, processed_at_ms, external_duration_ms) \
             VALUES (?, ?, ?)",
        )
        .bind(&record.request_id)
        .bind(processed_at_ms)
        .bind(external_duration_ms)
        .execute(&mut *self.0)
        .await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.0.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.0.rollback().await?;
        Ok(())
    }
}
