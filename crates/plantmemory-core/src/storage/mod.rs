mod config;
pub mod entry_store;
pub mod migrations;

pub use config::{CalendarConfig, Config, StorageConfig, WidgetConfig};
pub use entry_store::EntryStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/plantmemory[-dev]/` based on PLANTMEMORY_ENV.
///
/// Set PLANTMEMORY_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PLANTMEMORY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("plantmemory-dev")
    } else {
        base_dir.join("plantmemory")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
