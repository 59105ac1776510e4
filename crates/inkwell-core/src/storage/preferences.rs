//! Native platform preference store backed by a local libSQL database.

use std::fmt;
use std::path::{Path, PathBuf};

use libsql::{Builder, Connection, Database};
use tokio::sync::Mutex;

use super::backend::KeyValueBackend;
use crate::error::Result;

const CREATE_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS kv_store (key TEXT PRIMARY KEY, value TEXT NOT NULL)";

/// Key/value table in a libSQL database file.
pub struct PreferencesBackend {
    _db: Database,
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl PreferencesBackend {
    /// Open the store at `path`, creating the file and table when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let path_str = path.to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let backend = Self::from_database(db, Some(path.to_path_buf())).await?;
        tracing::debug!("Opened preference store at {}", path.display());
        Ok(backend)
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_database(db, None).await
    }

    async fn from_database(db: Database, path: Option<PathBuf>) -> Result<Self> {
        let conn = db.connect()?;
        conn.execute("PRAGMA journal_mode = WAL;", ()).await.ok();
        conn.execute(CREATE_TABLE_SQL, ()).await?;
        Ok(Self {
            _db: db,
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Debug for PreferencesBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferencesBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl KeyValueBackend for PreferencesBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .lock()
            .await
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .lock()
            .await
            .execute("DELETE FROM kv_store WHERE key = ?", [key])
            .await?;
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query("SELECT key FROM kv_store ORDER BY key", ())
            .await?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get::<String>(0)?);
        }
        Ok(keys)
    }
}
