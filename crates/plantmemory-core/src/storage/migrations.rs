//! Database schema migrations for the journal store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        tracing::info!(version = 1, "applied journal schema migration");
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get::<_, i32>(0),
    )
}

/// Migration v1: journal table with derived calendar columns.
///
/// `date_key` and `local_year` are derived in Rust from `timestamp` at write
/// time. The UNIQUE index on `date_key` is what rejects a second entry for
/// the same day.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS journal_entries (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            text         TEXT NOT NULL,
            timestamp    INTEGER NOT NULL,
            icon_type    TEXT NOT NULL,
            icon_variant INTEGER NOT NULL CHECK (icon_variant BETWEEN 1 AND 8),
            grid_x       REAL NOT NULL DEFAULT 0.0 CHECK (grid_x BETWEEN 0.0 AND 1.0),
            grid_y       REAL NOT NULL DEFAULT 0.0 CHECK (grid_y BETWEEN 0.0 AND 1.0),
            date_key     TEXT NOT NULL,
            local_year   INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_journal_entries_date_key ON journal_entries(date_key);
        CREATE INDEX IF NOT EXISTS idx_journal_entries_timestamp ON journal_entries(timestamp);
        CREATE INDEX IF NOT EXISTS idx_journal_entries_year_timestamp ON journal_entries(local_year, timestamp);",
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [1])?;

    tx.commit()?;
    Ok(())
}
