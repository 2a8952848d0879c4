//! services/client/src/adapters/store.rs
//!
//! This module contains the local state adapter, which is the concrete implementation
//! of the `LocalStore` port from the `core` crate. It keeps the persisted identity
//! and credential in a SQLite key/value table using `sqlx`.

use async_trait::async_trait;
use folio_core::ports::{LocalStore, PortError, PortResult};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A SQLite adapter that implements the `LocalStore` port.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new `SqliteStore` over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the database at `url` and makes sure the table exists.
    ///
    /// A single long-lived connection keeps `sqlite::memory:` databases alive
    /// for the lifetime of the store.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        let store = Self::new(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    /// Creates the key/value table at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS local_state (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

//=========================================================================================
// `LocalStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LocalStore for SqliteStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM local_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO local_state (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM local_state WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
