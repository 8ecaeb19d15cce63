//! Core error types for plantmemory-core.
//!
//! Every fallible operation in the library returns [`CoreError`]. Callers
//! match on the variant to decide between an inline message (validation),
//! a benign race outcome (not found) and a real storage failure.

use std::path::PathBuf;
use thiserror::Error;

use crate::entry::EntryId;

/// Core error type for plantmemory-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Caller-supplied input violates a domain rule.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Underlying storage failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Update referencing an id that no longer exists.
    #[error("Entry {id} not found")]
    NotFound { id: EntryId },

    /// Insert collided with an existing entry for the same local date.
    #[error("An entry already exists for {date_key}")]
    Conflict { date_key: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Storage-specific errors.
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
    #[error("Database migration failed: {source}")]
    MigrationFailed {
        #[source]
        source: rusqlite::Error,
    },

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A thread panicked while holding the connection
    #[error("Database connection lock poisoned")]
    Poisoned,

    /// The blocking task running a query was cancelled or panicked
    #[error("Storage task aborted: {0}")]
    TaskAborted(String),

    /// Upsert kept colliding after its single retry
    #[error("Upsert for {date_key} did not settle after retry")]
    RetryExhausted { date_key: String },
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

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Cannot prepare data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Entry text is empty after trimming
    #[error("Entry text must not be blank")]
    BlankText,

    /// Requested limit is zero
    #[error("Limit must be at least 1")]
    ZeroLimit,

    /// Unrecognised icon name
    #[error("Unknown icon type: {0}")]
    UnknownIcon(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
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

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        CoreError::Storage(StorageError::TaskAborted(err.to_string()))
    }
}

impl CoreError {
    /// True for failures expected to clear on their own by the next
    /// refresh cycle: a busy database or a row deleted mid-upsert.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Storage(StorageError::Locked) | CoreError::NotFound { .. }
        )
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(StorageError::from(err), StorageError::Locked));
    }

    #[test]
    fn other_sqlite_failures_map_to_query_failed() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(
            StorageError::from(err),
            StorageError::QueryFailed(_)
        ));
    }

    #[test]
    fn display_messages_name_the_subject() {
        let err = CoreError::Conflict {
            date_key: "2025-01-10".into(),
        };
        assert_eq!(err.to_string(), "An entry already exists for 2025-01-10");
        let err = CoreError::from(ValidationError::BlankText);
        assert_eq!(
            err.to_string(),
            "Validation error: Entry text must not be blank"
        );
    }

    #[test]
    fn only_busy_and_vanished_rows_are_transient() {
        assert!(CoreError::Storage(StorageError::Locked).is_transient());
        assert!(CoreError::NotFound { id: 3 }.is_transient());
        assert!(!CoreError::from(ValidationError::BlankText).is_transient());
        assert!(!CoreError::Storage(StorageError::Poisoned).is_transient());
        let corrupt = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CORRUPT),
            None,
        );
        assert!(!CoreError::from(corrupt).is_transient());
    }

    #[test]
    fn migration_failure_keeps_sqlite_source() {
        let err = StorageError::MigrationFailed {
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
