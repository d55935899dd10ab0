//! PostgreSQL implementation of the record store.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{Collection, RecordStore};
use crate::error::MonitorError;

/// PostgreSQL-backed record store using `sqlx::PgPool`.
///
/// All collections share one `records` table keyed by
/// `(collection, id)`; the record body is stored as JSONB.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

fn db_error(e: sqlx::Error) -> MonitorError {
    MonitorError::PersistenceError(e.to_string())
}

impl PostgresRecordStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool.
    ///
    /// # Errors
    ///
    /// Returns a [`MonitorError::PersistenceError`] if the database cannot
    /// be reached.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, MonitorError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `records` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`MonitorError::PersistenceError`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), MonitorError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (\
                collection TEXT NOT NULL, \
                id TEXT NOT NULL, \
                body JSONB NOT NULL, \
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
                PRIMARY KEY (collection, id))",
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        record: &Value,
    ) -> Result<(), MonitorError> {
        let result = sqlx::query(
            "INSERT INTO records (collection, id, body) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO NOTHING",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(record)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(MonitorError::RecordExists {
                collection: collection.as_str().to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn read(&self, collection: Collection, id: &str) -> Result<Value, MonitorError> {
        sqlx::query_scalar::<_, Value>(
            "SELECT body FROM records WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| MonitorError::not_found(collection.as_str(), id))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: &Value,
    ) -> Result<(), MonitorError> {
        let result = sqlx::query(
            "UPDATE records SET body = $3, updated_at = now() \
             WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(record)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(MonitorError::not_found(collection.as_str(), id));
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), MonitorError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(MonitorError::not_found(collection.as_str(), id));
        }
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<String>, MonitorError> {
        sqlx::query_scalar::<_, String>(
            "SELECT id FROM records WHERE collection = $1 ORDER BY id ASC",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }
}
