//! SQLite-backed journal entry store.
//!
//! Provides the durable CRUD and query surface over `journal_entries`:
//! - point lookups by id and by local date key
//! - ordered scans, per-year scans, recent-N
//! - aggregates (count, earliest timestamp, distinct years)
//! - live forms of every read via [`EntryStore::observe`]
//!
//! The store has no domain rules beyond the UNIQUE date key; the
//! one-entry-per-day upsert lives in [`crate::service::JournalService`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::watch;

use super::migrations;
use crate::calendar::{self, LocalZone};
use crate::entry::{EntryId, JournalEntry, NewEntry};
use crate::error::{CoreError, Result, StorageError};
use crate::icon::IconType;
use crate::live::LiveQuery;

const COLUMNS: &str = "id, text, timestamp, icon_type, icon_variant, grid_x, grid_y";

/// SQLite journal entry store.
///
/// All methods are synchronous and serialize on one connection; async
/// callers go through [`crate::live::blocking`]. Every committed mutation
/// bumps a change version that live queries wait on.
pub struct EntryStore {
    conn: Mutex<Connection>,
    zone: LocalZone,
    changes: watch::Sender<u64>,
    path: Option<PathBuf>,
}

impl EntryStore {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, zone: LocalZone) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut store = Self::from_connection(conn, zone)?;
        store.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "opened journal store");
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_memory(zone: LocalZone) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Self::from_connection(conn, zone)
    }

    fn from_connection(conn: Connection, zone: LocalZone) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(StorageError::from)?;
        migrations::migrate(&conn).map_err(|source| StorageError::MigrationFailed { source })?;
        let (changes, _) = watch::channel(0);
        Ok(Self {
            conn: Mutex::new(conn),
            zone,
            changes,
            path: None,
        })
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// Backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Storage(StorageError::Poisoned))
    }

    fn notify(&self) {
        // send_modify updates the value even with zero receivers.
        self.changes.send_modify(|version| *version += 1);
    }

    /// Number of committed mutations since the store was opened.
    pub fn version(&self) -> u64 {
        *self.changes.borrow()
    }

    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Insert a new row and return its id.
    ///
    /// # Errors
    /// [`CoreError::Validation`] if the timestamp has no representable day;
    /// [`CoreError::Conflict`] if a row already exists for the entry's local
    /// date; [`CoreError::Storage`] on any other failure.
    pub fn insert(&self, entry: &NewEntry) -> Result<EntryId> {
        calendar::check_timestamp(entry.timestamp)?;
        let date_key = self.zone.date_key(entry.timestamp);
        let year = self.zone.local_year(entry.timestamp);
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO journal_entries
                (text, timestamp, icon_type, icon_variant, grid_x, grid_y, date_key, local_year)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.text,
                entry.timestamp,
                entry.icon_type.as_str(),
                entry.icon_variant,
                f64::from(entry.grid_x),
                f64::from(entry.grid_y),
                date_key,
                year,
            ],
        );
        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                drop(conn);
                tracing::info!(id, date_key = %date_key, "inserted journal entry");
                self.notify();
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(CoreError::Conflict { date_key }),
            Err(e) => Err(StorageError::from(e).into()),
        }
    }

    /// Replace the row with `entry.id`.
    ///
    /// Derived calendar columns are recomputed from `entry.timestamp`.
    ///
    /// # Errors
    /// [`CoreError::NotFound`] if no row has that id; [`CoreError::Conflict`]
    /// if the new timestamp lands on a day another row already owns.
    pub fn update(&self, entry: &JournalEntry) -> Result<()> {
        calendar::check_timestamp(entry.timestamp)?;
        let date_key = self.zone.date_key(entry.timestamp);
        let year = self.zone.local_year(entry.timestamp);
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE journal_entries
             SET text = ?1, timestamp = ?2, icon_type = ?3, icon_variant = ?4,
                 grid_x = ?5, grid_y = ?6, date_key = ?7, local_year = ?8
             WHERE id = ?9",
            params![
                entry.text,
                entry.timestamp,
                entry.icon_type.as_str(),
                entry.icon_variant,
                f64::from(entry.grid_x),
                f64::from(entry.grid_y),
                date_key,
                year,
                entry.id,
            ],
        );
        match changed {
            Ok(0) => Err(CoreError::NotFound { id: entry.id }),
            Ok(_) => {
                drop(conn);
                tracing::info!(id = entry.id, date_key = %date_key, "updated journal entry");
                self.notify();
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(CoreError::Conflict { date_key }),
            Err(e) => Err(StorageError::from(e).into()),
        }
    }

    /// Remove the row with `entry.id`. Returns whether a row was removed;
    /// a missing row is a no-op and does not wake subscribers.
    pub fn delete(&self, entry: &JournalEntry) -> Result<bool> {
        self.delete_by_id(entry.id)
    }

    pub fn delete_by_id(&self, id: EntryId) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM journal_entries WHERE id = ?1", params![id])
            .map_err(StorageError::from)?;
        drop(conn);
        if removed > 0 {
            tracing::info!(id, "deleted journal entry");
            self.notify();
        }
        Ok(removed > 0)
    }

    // ── Point lookups ────────────────────────────────────────────────

    pub fn get_by_id(&self, id: EntryId) -> Result<Option<JournalEntry>> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM journal_entries WHERE id = ?1"),
                params![id],
                row_to_entry,
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(entry)
    }

    /// Entry whose local date is `date_key` (`YYYY-MM-DD`).
    ///
    /// The UNIQUE index makes more than one match impossible; if a legacy
    /// file ever held duplicates, the lowest id wins.
    pub fn get_by_local_date(&self, date_key: &str) -> Result<Option<JournalEntry>> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM journal_entries WHERE date_key = ?1
                     ORDER BY id ASC LIMIT 1"
                ),
                params![date_key],
                row_to_entry,
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(entry)
    }

    /// Entry on the local date of `timestamp_ms`.
    pub fn get_by_timestamp_date(&self, timestamp_ms: i64) -> Result<Option<JournalEntry>> {
        calendar::check_timestamp(timestamp_ms)?;
        self.get_by_local_date(&self.zone.date_key(timestamp_ms))
    }

    // ── Scans ────────────────────────────────────────────────────────

    fn query_entries(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<JournalEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map(args, row_to_entry)
            .map_err(StorageError::from)?;
        let entries = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(entries)
    }

    /// All entries, oldest first. Ties break on id.
    pub fn all_ascending(&self) -> Result<Vec<JournalEntry>> {
        self.query_entries(
            &format!("SELECT {COLUMNS} FROM journal_entries ORDER BY timestamp ASC, id ASC"),
            &[],
        )
    }

    /// All entries, newest first. Ties break on id.
    pub fn all_descending(&self) -> Result<Vec<JournalEntry>> {
        self.query_entries(
            &format!("SELECT {COLUMNS} FROM journal_entries ORDER BY timestamp DESC, id DESC"),
            &[],
        )
    }

    /// Entries of one local year, newest first. Empty for a year with none.
    pub fn by_year(&self, year: i32) -> Result<Vec<JournalEntry>> {
        self.query_entries(
            &format!(
                "SELECT {COLUMNS} FROM journal_entries WHERE local_year = ?1
                 ORDER BY timestamp DESC, id DESC"
            ),
            &[&year],
        )
    }

    /// At most `limit` entries of one local year, newest first.
    pub fn by_year_limited(&self, year: i32, limit: u32) -> Result<Vec<JournalEntry>> {
        self.query_entries(
            &format!(
                "SELECT {COLUMNS} FROM journal_entries WHERE local_year = ?1
                 ORDER BY timestamp DESC, id DESC LIMIT ?2"
            ),
            &[&year, &limit],
        )
    }

    /// The `limit` most recent entries.
    pub fn recent(&self, limit: u32) -> Result<Vec<JournalEntry>> {
        self.query_entries(
            &format!(
                "SELECT {COLUMNS} FROM journal_entries ORDER BY timestamp DESC, id DESC LIMIT ?1"
            ),
            &[&limit],
        )
    }

    // ── Aggregates ───────────────────────────────────────────────────

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM journal_entries", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count.max(0) as u64)
    }

    /// Earliest timestamp, `None` when the store is empty.
    pub fn min_timestamp(&self) -> Result<Option<i64>> {
        let conn = self.lock()?;
        let min = conn
            .query_row("SELECT MIN(timestamp) FROM journal_entries", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .map_err(StorageError::from)?;
        Ok(min)
    }

    /// Years that hold at least one entry, newest first.
    pub fn distinct_local_years(&self) -> Result<Vec<i32>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT local_year FROM journal_entries ORDER BY local_year DESC")
            .map_err(StorageError::from)?;
        let years = stmt
            .query_map([], |row| row.get::<_, i32>(0))
            .map_err(StorageError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(years)
    }

    // ── Live forms ───────────────────────────────────────────────────

    /// Live subscription re-running `query` after every committed mutation.
    pub fn observe<T, F>(self: &Arc<Self>, query: F) -> LiveQuery<T>
    where
        T: Send + 'static,
        F: Fn(&EntryStore) -> Result<T> + Send + Sync + 'static,
    {
        LiveQuery::new(Arc::clone(self), query)
    }

    pub fn observe_all_ascending(self: &Arc<Self>) -> LiveQuery<Vec<JournalEntry>> {
        self.observe(EntryStore::all_ascending)
    }

    pub fn observe_all_descending(self: &Arc<Self>) -> LiveQuery<Vec<JournalEntry>> {
        self.observe(EntryStore::all_descending)
    }

    pub fn observe_by_year(self: &Arc<Self>, year: i32) -> LiveQuery<Vec<JournalEntry>> {
        self.observe(move |store| store.by_year(year))
    }

    pub fn observe_by_id(self: &Arc<Self>, id: EntryId) -> LiveQuery<Option<JournalEntry>> {
        self.observe(move |store| store.get_by_id(id))
    }

    pub fn observe_by_local_date(
        self: &Arc<Self>,
        date_key: impl Into<String>,
    ) -> LiveQuery<Option<JournalEntry>> {
        let date_key = date_key.into();
        self.observe(move |store| store.get_by_local_date(&date_key))
    }

    pub fn observe_count(self: &Arc<Self>) -> LiveQuery<u64> {
        self.observe(EntryStore::count)
    }

    pub fn observe_min_timestamp(self: &Arc<Self>) -> LiveQuery<Option<i64>> {
        self.observe(EntryStore::min_timestamp)
    }

    pub fn observe_distinct_local_years(self: &Arc<Self>) -> LiveQuery<Vec<i32>> {
        self.observe(EntryStore::distinct_local_years)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    let icon: String = row.get(3)?;
    Ok(JournalEntry {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        icon_type: IconType::from_stored(&icon),
        icon_variant: row.get(4)?,
        grid_x: row.get::<_, f64>(5)? as f32,
        grid_y: row.get::<_, f64>(6)? as f32,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-01-10T12:00:00Z
    const T: i64 = 1_736_510_400_000;
    const DAY: i64 = crate::calendar::DAY_MILLIS;

    fn store() -> EntryStore {
        EntryStore::open_memory(LocalZone::utc()).unwrap()
    }

    fn new_entry(text: &str, timestamp: i64) -> NewEntry {
        NewEntry {
            text: text.into(),
            timestamp,
            icon_type: IconType::Simple,
            icon_variant: 3,
            grid_x: 0.25,
            grid_y: 0.75,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let db = store();
        let id = db.insert(&new_entry("hello", T)).unwrap();
        let got = db.get_by_id(id).unwrap().unwrap();
        assert_eq!(got, new_entry("hello", T).into_entry(id));
        assert_eq!(db.get_by_local_date("2025-01-10").unwrap().unwrap().id, id);
        assert!(db.get_by_local_date("2025-01-11").unwrap().is_none());
        assert_eq!(db.get_by_timestamp_date(T + 3_600_000).unwrap().unwrap().id, id);
    }

    #[test]
    fn second_insert_for_same_day_conflicts() {
        let db = store();
        db.insert(&new_entry("first", T)).unwrap();
        let err = db.insert(&new_entry("second", T + 60_000)).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { ref date_key } if date_key == "2025-01-10"));
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn update_missing_id_is_not_found() {
        let db = store();
        let ghost = new_entry("ghost", T).into_entry(99);
        assert!(matches!(
            db.update(&ghost),
            Err(CoreError::NotFound { id: 99 })
        ));
    }

    #[test]
    fn update_replaces_fields() {
        let db = store();
        let id = db.insert(&new_entry("hello", T)).unwrap();
        let mut entry = db.get_by_id(id).unwrap().unwrap();
        entry.text = "changed".into();
        entry.icon_type = IconType::Fern;
        db.update(&entry).unwrap();
        assert_eq!(db.get_by_id(id).unwrap().unwrap(), entry);
    }

    #[test]
    fn update_onto_taken_day_conflicts() {
        let db = store();
        db.insert(&new_entry("a", T)).unwrap();
        let id = db.insert(&new_entry("b", T + DAY)).unwrap();
        let mut moved = db.get_by_id(id).unwrap().unwrap();
        moved.timestamp = T;
        assert!(matches!(db.update(&moved), Err(CoreError::Conflict { .. })));
    }

    #[test]
    fn delete_missing_is_silent_noop() {
        let db = store();
        let id = db.insert(&new_entry("x", T)).unwrap();
        let entry = db.get_by_id(id).unwrap().unwrap();
        assert!(db.delete(&entry).unwrap());
        let version = db.version();
        assert!(!db.delete(&entry).unwrap());
        assert_eq!(db.version(), version);
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn scans_are_ordered_by_timestamp() {
        let db = store();
        let b = db.insert(&new_entry("b", T + DAY)).unwrap();
        let a = db.insert(&new_entry("a", T)).unwrap();
        let c = db.insert(&new_entry("c", T + 2 * DAY)).unwrap();
        let asc: Vec<_> = db.all_ascending().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(asc, vec![a, b, c]);
        let desc: Vec<_> = db.all_descending().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(desc, vec![c, b, a]);
        let recent: Vec<_> = db.recent(2).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(recent, vec![c, b]);
    }

    #[test]
    fn year_partitioning() {
        let db = store();
        db.insert(&new_entry("2025", T)).unwrap();
        db.insert(&new_entry("2024a", T - 30 * DAY)).unwrap();
        db.insert(&new_entry("2024b", T - 40 * DAY)).unwrap();
        assert_eq!(db.by_year(2024).unwrap().len(), 2);
        assert_eq!(db.by_year(2024).unwrap()[0].text, "2024a");
        assert_eq!(db.by_year_limited(2024, 1).unwrap().len(), 1);
        assert!(db.by_year(2019).unwrap().is_empty());
        assert_eq!(db.distinct_local_years().unwrap(), vec![2025, 2024]);
    }

    #[test]
    fn aggregates_on_empty_and_filled_store() {
        let db = store();
        assert_eq!(db.count().unwrap(), 0);
        assert_eq!(db.min_timestamp().unwrap(), None);
        assert!(db.distinct_local_years().unwrap().is_empty());
        db.insert(&new_entry("late", T + DAY)).unwrap();
        db.insert(&new_entry("early", T)).unwrap();
        assert_eq!(db.count().unwrap(), 2);
        assert_eq!(db.min_timestamp().unwrap(), Some(T));
    }

    #[test]
    fn every_committed_mutation_bumps_version() {
        let db = store();
        assert_eq!(db.version(), 0);
        let id = db.insert(&new_entry("x", T)).unwrap();
        assert_eq!(db.version(), 1);
        let _ = db.insert(&new_entry("dup", T));
        assert_eq!(db.version(), 1);
        let entry = db.get_by_id(id).unwrap().unwrap();
        db.update(&entry).unwrap();
        db.delete(&entry).unwrap();
        assert_eq!(db.version(), 3);
    }

    #[test]
    fn unknown_icon_names_read_as_simple() {
        let db = store();
        let id = db.insert(&new_entry("x", T)).unwrap();
        db.lock()
            .unwrap()
            .execute(
                "UPDATE journal_entries SET icon_type = 'dragon' WHERE id = ?1",
                params![id],
            )
            .unwrap();
        assert_eq!(db.get_by_id(id).unwrap().unwrap().icon_type, IconType::Simple);
    }

    #[tokio::test]
    async fn live_day_lookup_follows_writes() {
        let db = Arc::new(store());
        let mut day = db.observe_by_local_date("2025-01-10");
        assert!(day.next().await.unwrap().is_none());

        db.insert(&new_entry("other day", T + DAY)).unwrap();
        let id = db.insert(&new_entry("today", T)).unwrap();
        assert_eq!(day.next().await.unwrap().unwrap().text, "today");

        let mut by_id = db.observe_by_id(id);
        assert_eq!(by_id.next().await.unwrap().unwrap().text, "today");
        let mut edited = db.get_by_id(id).unwrap().unwrap();
        edited.text = "today, edited".into();
        db.update(&edited).unwrap();
        assert_eq!(by_id.next().await.unwrap().unwrap().text, "today, edited");
        db.delete(&edited).unwrap();
        assert!(by_id.next().await.unwrap().is_none());
        assert!(day.next().await.unwrap().is_none());
    }

    #[test]
    fn out_of_range_timestamps_never_reach_the_table() {
        let db = store();
        let epoch = db.insert(&new_entry("epoch", 0)).unwrap();
        let err = db.insert(&new_entry("overflow", i64::MAX)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let mut moved = db.get_by_id(epoch).unwrap().unwrap();
        moved.timestamp = i64::MIN;
        assert!(matches!(db.update(&moved), Err(CoreError::Validation(_))));
        assert!(db.get_by_timestamp_date(i64::MAX).is_err());

        assert_eq!(db.get_by_id(epoch).unwrap().unwrap().timestamp, 0);
        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.version(), 1);
    }
}
