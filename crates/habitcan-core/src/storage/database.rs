//! SQLite-backed key-value storage.
//!
//! The engine keeps its whole state as one versioned JSON document under
//! [`STATE_KEY`](super::STATE_KEY); this module only knows about keys and
//! string values.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rusqlite::{params, Connection};

use super::{data_dir, migrations, snapshot::STATE_KEY, StateStore};
use crate::error::StorageError;

/// SQLite database holding the `kv` table.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/habitcan/habitcan.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("habitcan.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// When `key` was last written, RFC 3339.
    pub fn kv_updated_at(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.conn.query_row(
            "SELECT updated_at FROM kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(v) if v.is_empty() => Ok(None),
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// [`StateStore`] over a SQLite database.
///
/// The connection is not `Sync`, so it sits behind a mutex.
pub struct SqliteStateStore {
    db: Mutex<Database>,
}

impl SqliteStateStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open the store at the default location.
    pub fn open() -> Result<Self, StorageError> {
        Database::open().map(Self::new)
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        Database::open_at(path).map(Self::new)
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        self.db
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .kv_get(STATE_KEY)
    }

    fn save(&self, document: &str) -> Result<(), StorageError> {
        self.db
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .kv_set(STATE_KEY, document)
    }
}
