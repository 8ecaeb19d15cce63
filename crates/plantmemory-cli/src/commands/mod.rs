pub mod config;
pub mod entry;
pub mod garden;
pub mod icons;
pub mod stats;

use std::sync::Arc;

use plantmemory_core::{Config, CoreError, EntryStore, JournalService};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Service over the database named by `config`.
pub fn open_service(config: &Config) -> Result<JournalService, CoreError> {
    let zone = config.zone()?;
    let path = config.database_path()?;
    let store = EntryStore::open(&path, zone)?;
    Ok(JournalService::new(Arc::new(store)))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
