//! SQLite-backed secret store.
//!
//! Stores each secret as a JSON text row keyed by path. Suitable for a local
//! development vault or a single-node deployment; production setups plug in
//! their own [`SecretStore`] client instead.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;

use super::traits::{child_names, SecretStore, StoreError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS secrets (
    path TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)";

/// A [`SecretStore`] persisted in a SQLite database file.
///
/// Calls run synchronously on the calling task; SQLite operations here are
/// single-row and short.
pub struct SqliteSecretStore {
    conn: Mutex<Connection>,
}

impl SqliteSecretStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Opened SQLite secret store");
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
    async fn read_secret(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT data FROM secrets WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StoreError::Corrupted {
                path: path.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    async fn write_secret(&self, path: &str, data: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(data)?;
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.lock().execute(
            "INSERT INTO secrets (path, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![path, text, now],
        )?;
        Ok(())
    }

    async fn list_secrets(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let trimmed = path.trim_end_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        };

        let paths: Vec<String> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT path FROM secrets WHERE substr(path, 1, length(?1)) = ?1 ORDER BY path",
            )?;
            let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<String>, _>>()?
        };

        Ok(child_names(path, paths.iter().map(String::as_str)))
    }

    async fn delete_secret(&self, path: &str) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute("DELETE FROM secrets WHERE path = ?1", params![path])?;
        Ok(())
    }
}
