//! Core error types for habitcan-core.
//!
//! The engine never lets these escape into its drivers: rule and provider
//! errors are downgraded to "zero increments" at the evaluator boundary and
//! storage errors are logged while the in-memory state keeps the mutation.
//! They still surface through the library API for callers that want them
//! (the CLI, the config layer, the SQLite store).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for habitcan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed rule definitions
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Task timeline or timer collaborator failures
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Persistence-layer errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored state document could not be decoded
    #[error("Corrupt state document: {0}")]
    Corrupt(String),

    /// Stored state was written by a newer build
    #[error("Unsupported state version {found} (this build understands up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Malformed rule definitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// A clock time was not in `HH:MM` form
    #[error("Invalid clock time '{0}', expected HH:MM")]
    InvalidClockTime(String),

    /// Keyword rule without any usable keyword
    #[error("Keyword rule has no keywords")]
    EmptyKeywords,

    /// Task-status rule with a zero multiplier
    #[error("count_per_occurrence must be at least 1")]
    ZeroCountPerOccurrence,
}

/// Collaborator failures (task timeline, timeout counters).
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The collaborator could not be reached or read
    #[error("Task timeline unavailable: {0}")]
    Unavailable(String),

    /// The collaborator returned data that could not be decoded
    #[error("Malformed timeline data: {0}")]
    Malformed(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
