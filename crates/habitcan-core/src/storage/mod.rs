mod config;
pub mod database;
pub mod migrations;
pub mod snapshot;

pub use config::{AnalyticsConfig, Config, MonitorConfig, SettlementConfig, SleepDayConfig};
pub use database::{Database, SqliteStateStore};
pub use snapshot::{decode_state, encode_state, CURRENT_VERSION, STATE_KEY};

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::StorageError;

/// Returns `~/.config/habitcan[-dev]/` based on HABITCAN_ENV.
///
/// Set HABITCAN_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITCAN_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitcan-dev")
    } else {
        base_dir.join("habitcan")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Raw persistence of the engine state document.
pub trait StateStore: Send + Sync {
    /// The stored document, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<String>, StorageError>;

    fn save(&self, document: &str) -> Result<(), StorageError>;
}

/// In-process store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    document: Mutex<Option<String>>,
    read_only: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
            read_only: false,
        }
    }

    /// A store whose writes always fail.
    pub fn read_only() -> Self {
        Self {
            document: Mutex::new(None),
            read_only: true,
        }
    }

    pub fn document(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.document())
    }

    fn save(&self, document: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::QueryFailed("store is read-only".into()));
        }
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(document.to_string());
        Ok(())
    }
}
