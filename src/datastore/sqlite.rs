//! SQLite-backed durable store with a bounded connection pool.

use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{Datastore, StoreError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kvstore (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

/// [`Datastore`] over a single `kvstore` table.
///
/// Connections are pooled and shared by all workers; checkout waits at most
/// the configured timeout, and so do SQLite lock waits.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Prepares a store for the database at `path`.
    ///
    /// No connection is made here. Each pooled connection is opened on first
    /// checkout and creates the schema if needed, so an unreachable database
    /// fails individual calls instead of startup.
    pub fn open(path: &str, pool_size: u32, timeout: Duration) -> Self {
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.busy_timeout(timeout)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            conn.execute_batch(SCHEMA)
        });

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .min_idle(Some(0))
            .connection_timeout(timeout)
            .build_unchecked(manager);

        info!(path, pool_size, "SQLite store configured");
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}

impl Datastore for SqliteStore {
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO kvstore (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM kvstore WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM kvstore WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }
}
