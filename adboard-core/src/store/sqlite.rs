//! SQLite-backed durable store implementation.
//!
//! Schema (owned jointly with the external ingestion and reference-data
//! processes; this subsystem only creates it if missing):
//!
//! - `config_tokens(provider, token_type, access_token)`, unique on
//!   `(provider, token_type)`
//! - `product_performance_daily(id, product_code, report_date, spend, outcome_count)`
//! - `product_mappings(product_code, product_name)`
//!
//! Upsert atomicity for credentials is delegated to SQLite's
//! `ON CONFLICT ... DO UPDATE`, so concurrent saves for the same key
//! resolve to exactly one final row.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::model::{CredentialRecord, PerformanceRecord, ProviderId, TokenType};

use super::{CredentialStore, ReportStore, Secret, StoreError};

/// SQLite-backed implementation of [`CredentialStore`] and [`ReportStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) a SQLite database at the given URL and
    /// ensure the schema exists.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let store = SqliteStore::connect("sqlite:///var/lib/adboard/adboard.db").await?;
    /// ```
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Backend {
                message: format!("invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory database, for tests and local experimentation.
    ///
    /// The pool is pinned to a single connection; a second connection would
    /// see its own, separate in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool. The schema is assumed to exist.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS config_tokens (
                provider TEXT NOT NULL,
                token_type TEXT NOT NULL,
                access_token TEXT NOT NULL,
                UNIQUE(provider, token_type)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS product_performance_daily (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_code TEXT NOT NULL,
                report_date TEXT NOT NULL,
                spend REAL NOT NULL,
                outcome_count INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS product_mappings (
                product_code TEXT NOT NULL,
                product_name TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_credential(row: &SqliteRow) -> Result<CredentialRecord, StoreError> {
    let provider: String = row.try_get("provider")?;
    let token_type: String = row.try_get("token_type")?;
    let access_token: String = row.try_get("access_token")?;

    Ok(CredentialRecord {
        provider: ProviderId::new(provider),
        token_type: TokenType::from_str_loose(&token_type),
        access_token: Secret::new(access_token),
    })
}

fn row_to_performance(row: &SqliteRow) -> Result<PerformanceRecord, StoreError> {
    let id: i64 = row.try_get("id")?;
    let product_code: String = row.try_get("product_code")?;
    let report_date: NaiveDate = row.try_get("report_date")?;
    let spend: f64 = row.try_get("spend")?;
    let outcome_count: i64 = row.try_get("outcome_count")?;

    // try_new rejects rows the ingestion job should never have written.
    Ok(PerformanceRecord::try_new(
        id,
        product_code,
        report_date,
        spend,
        outcome_count,
    )?)
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn get_current(
        &self,
        provider: &ProviderId,
        token_type: &TokenType,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT provider, token_type, access_token
             FROM config_tokens
             WHERE provider = ?1 AND token_type = ?2",
        )
        .bind(provider.as_str())
        .bind(token_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_credential(&row)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO config_tokens (provider, token_type, access_token)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(provider, token_type)
             DO UPDATE SET access_token = excluded.access_token",
        )
        .bind(record.provider.as_str())
        .bind(record.token_type.as_str())
        .bind(record.access_token.expose())
        .execute(&self.pool)
        .await?;

        tracing::debug!(provider = %record.provider, "credential upserted");

        Ok(())
    }
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn recent_performance(
        &self,
        limit: u32,
    ) -> Result<Vec<PerformanceRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, product_code, report_date, spend, outcome_count
             FROM product_performance_daily
             ORDER BY report_date DESC
             LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_performance).collect()
    }

    async fn product_mappings(&self) -> Result<Vec<(String, String)>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_code, product_name
             FROM product_mappings
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let code: String = row.try_get("product_code")?;
                let name: String = row.try_get("product_name")?;
                Ok((code, name))
            })
            .collect()
    }
}
