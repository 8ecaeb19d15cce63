//! Journal service: the single entry point for every consumer.
//!
//! Wraps the [`EntryStore`] with the domain rules:
//! - one entry per local calendar day, via find-then-upsert
//! - random cosmetic attributes from an injected [`CosmeticSource`]
//! - days-of-growth against an injected [`Clock`]
//!
//! and exposes snapshot reads (for consumers that poll once, like a widget
//! refresh) next to live reads (for a screen that stays subscribed).
//!
//! ## Same-day races
//!
//! The lookup and the write of an upsert are separate store calls, so two
//! concurrent saves for one day can both see "no entry". The store's UNIQUE
//! date key rejects the second insert with [`CoreError::Conflict`], and the
//! upsert re-reads the winner and applies itself as an update instead. It
//! retries once; a second collision surfaces as
//! [`StorageError::RetryExhausted`].

use std::sync::{Arc, Mutex};

use crate::calendar::{check_timestamp, LocalZone, DAY_MILLIS};
use crate::clock::{Clock, SystemClock};
use crate::cosmetics::{CosmeticSource, RandomCosmetics};
use crate::entry::{EntryId, JournalEntry, NewEntry};
use crate::error::{CoreError, Result, StorageError, ValidationError};
use crate::garden::{self, GardenView};
use crate::icon::IconType;
use crate::live::{blocking, LiveQuery};
use crate::storage::EntryStore;

type SharedCosmetics = Arc<Mutex<Box<dyn CosmeticSource>>>;

/// Domain layer over the entry store.
///
/// Cheap to clone; every clone shares the same store, clock and
/// randomness source, so hand one to each consumer.
#[derive(Clone)]
pub struct JournalService {
    store: Arc<EntryStore>,
    clock: Arc<dyn Clock>,
    cosmetics: SharedCosmetics,
}

impl JournalService {
    /// Service on the system clock with entropy-seeded cosmetics.
    pub fn new(store: Arc<EntryStore>) -> Self {
        Self::with_parts(store, Arc::new(SystemClock), RandomCosmetics::from_entropy())
    }

    pub fn with_parts(
        store: Arc<EntryStore>,
        clock: Arc<dyn Clock>,
        cosmetics: impl CosmeticSource + 'static,
    ) -> Self {
        Self {
            store,
            clock,
            cosmetics: Arc::new(Mutex::new(Box::new(cosmetics))),
        }
    }

    pub fn store(&self) -> &Arc<EntryStore> {
        &self.store
    }

    pub fn zone(&self) -> LocalZone {
        self.store.zone()
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn current_year(&self) -> i32 {
        self.zone().local_year(self.now_millis())
    }

    /// The one-per-day key for `timestamp_ms`. Consumers use this rather
    /// than formatting dates themselves.
    pub fn date_key_of(&self, timestamp_ms: i64) -> String {
        self.zone().date_key(timestamp_ms)
    }

    /// `timestamp_ms`, or now if it lies in the future.
    pub fn clamp_to_today(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.min(self.now_millis())
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Save the memory for the local day of `timestamp_ms` (now if `None`).
    ///
    /// A day with no entry gets a new one with fresh variant and grid
    /// position. A day that already has one keeps its id, timestamp and grid
    /// position; its text and icon are replaced and its variant re-rolled.
    /// Text is stored trimmed.
    ///
    /// # Errors
    /// [`ValidationError::BlankText`] before any store access if the text is
    /// blank; [`ValidationError::InvalidValue`] if the timestamp lies outside
    /// years 1..=9999; storage failures otherwise.
    pub async fn create_or_update_for_date(
        &self,
        text: &str,
        icon_type: IconType,
        timestamp_ms: Option<i64>,
    ) -> Result<EntryId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::BlankText.into());
        }
        let text = text.to_string();
        let timestamp = check_timestamp(timestamp_ms.unwrap_or_else(|| self.now_millis()))?;
        let cosmetics = Arc::clone(&self.cosmetics);
        blocking(&self.store, move |store| {
            upsert(store, &cosmetics, text, icon_type, timestamp)
        })
        .await
    }

    /// Remove `entry`. Returns whether anything was removed; an entry that
    /// is already gone is a silent no-op.
    pub async fn delete(&self, entry: &JournalEntry) -> Result<bool> {
        let id = entry.id;
        blocking(&self.store, move |store| store.delete_by_id(id)).await
    }

    pub async fn delete_by_id(&self, id: EntryId) -> Result<bool> {
        blocking(&self.store, move |store| store.delete_by_id(id)).await
    }

    // ── Snapshot reads ───────────────────────────────────────────────

    /// Existing entry for the local day of `timestamp_ms`, without writing.
    pub async fn get_entry_by_date(&self, timestamp_ms: i64) -> Result<Option<JournalEntry>> {
        blocking(&self.store, move |store| store.get_by_timestamp_date(timestamp_ms)).await
    }

    pub async fn get_by_id(&self, id: EntryId) -> Result<Option<JournalEntry>> {
        blocking(&self.store, move |store| store.get_by_id(id)).await
    }

    /// The `limit` most recent entries, newest first.
    pub async fn recent_entries(&self, limit: u32) -> Result<Vec<JournalEntry>> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }
        blocking(&self.store, move |store| store.recent(limit)).await
    }

    /// At most `limit` entries of `year`, newest first.
    pub async fn entries_for_year(&self, year: i32, limit: u32) -> Result<Vec<JournalEntry>> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit.into());
        }
        blocking(&self.store, move |store| store.by_year_limited(year, limit)).await
    }

    pub async fn all_entries(&self) -> Result<Vec<JournalEntry>> {
        blocking(&self.store, EntryStore::all_descending).await
    }

    pub async fn entry_count(&self) -> Result<u64> {
        blocking(&self.store, EntryStore::count).await
    }

    pub async fn first_entry_timestamp(&self) -> Result<Option<i64>> {
        blocking(&self.store, EntryStore::min_timestamp).await
    }

    /// Years with entries plus the current year, newest first.
    pub async fn distinct_years(&self) -> Result<Vec<i32>> {
        let current = self.current_year();
        blocking(&self.store, move |store| years_with_current(store, current)).await
    }

    /// Inclusive day count since `first_timestamp`; 0 with no entries.
    ///
    /// An earliest entry dated after now still counts as day 1.
    pub fn days_of_growth(&self, first_timestamp: Option<i64>) -> u32 {
        days_of_growth(first_timestamp, self.now_millis())
    }

    /// Year a garden showing `selected_year` should switch to after
    /// `deleted` was removed.
    pub fn year_after_delete(&self, deleted: &JournalEntry, selected_year: i32) -> i32 {
        garden::fallback_year(
            deleted.local_year(self.zone()),
            selected_year,
            self.current_year(),
        )
    }

    /// Snapshot of the garden screen for `year`.
    pub async fn garden(&self, year: i32) -> Result<GardenView> {
        let clock = Arc::clone(&self.clock);
        blocking(&self.store, move |store| {
            garden::build(store, year, clock.now_millis())
        })
        .await
    }

    // ── Live reads ───────────────────────────────────────────────────

    /// All entries, newest first.
    pub fn observe_all_entries(&self) -> LiveQuery<Vec<JournalEntry>> {
        self.store.observe_all_descending()
    }

    /// All entries, oldest first, for calendar layout.
    pub fn observe_all_entries_ascending(&self) -> LiveQuery<Vec<JournalEntry>> {
        self.store.observe_all_ascending()
    }

    pub fn observe_entries_for_year(&self, year: i32) -> LiveQuery<Vec<JournalEntry>> {
        self.store.observe_by_year(year)
    }

    /// Years with entries plus the current year (as of each emission).
    pub fn observe_distinct_years(&self) -> LiveQuery<Vec<i32>> {
        let clock = Arc::clone(&self.clock);
        self.store.observe(move |store| {
            let current = store.zone().local_year(clock.now_millis());
            years_with_current(store, current)
        })
    }

    pub fn observe_entry_count(&self) -> LiveQuery<u64> {
        self.store.observe_count()
    }

    pub fn observe_first_entry_timestamp(&self) -> LiveQuery<Option<i64>> {
        self.store.observe_min_timestamp()
    }

    pub fn observe_days_of_growth(&self) -> LiveQuery<u32> {
        let clock = Arc::clone(&self.clock);
        self.store.observe(move |store| {
            Ok(days_of_growth(store.min_timestamp()?, clock.now_millis()))
        })
    }

    pub fn observe_garden(&self, year: i32) -> LiveQuery<GardenView> {
        let clock = Arc::clone(&self.clock);
        self.store
            .observe(move |store| garden::build(store, year, clock.now_millis()))
    }
}

pub(crate) fn days_of_growth(first_timestamp: Option<i64>, now_ms: i64) -> u32 {
    match first_timestamp {
        None => 0,
        Some(first) => {
            let days = (now_ms - first).max(0) / DAY_MILLIS;
            u32::try_from(days).unwrap_or(u32::MAX - 1) + 1
        }
    }
}

pub(crate) fn years_with_current(store: &EntryStore, current_year: i32) -> Result<Vec<i32>> {
    let mut years = store.distinct_local_years()?;
    if !years.contains(&current_year) {
        years.push(current_year);
        years.sort_unstable_by(|a, b| b.cmp(a));
    }
    Ok(years)
}

fn roll_variant(cosmetics: &SharedCosmetics) -> u8 {
    // A panic elsewhere cannot leave the generator in a bad state.
    let mut source = cosmetics.lock().unwrap_or_else(|e| e.into_inner());
    source.icon_variant()
}

fn roll_new(cosmetics: &SharedCosmetics) -> (u8, f32, f32) {
    let mut source = cosmetics.lock().unwrap_or_else(|e| e.into_inner());
    let variant = source.icon_variant();
    let x = source.grid_coordinate();
    let y = source.grid_coordinate();
    (variant, x, y)
}

/// Find-then-write for one day, with a single retry on a lost race.
fn upsert(
    store: &EntryStore,
    cosmetics: &SharedCosmetics,
    text: String,
    icon_type: IconType,
    timestamp: i64,
) -> Result<EntryId> {
    let date_key = store.zone().date_key(timestamp);
    let existing = store.get_by_local_date(&date_key)?;
    apply_upsert(store, cosmetics, text, icon_type, timestamp, date_key, existing)
}

/// Write side of [`upsert`], starting from the result of its lookup.
fn apply_upsert(
    store: &EntryStore,
    cosmetics: &SharedCosmetics,
    text: String,
    icon_type: IconType,
    timestamp: i64,
    date_key: String,
    mut existing: Option<JournalEntry>,
) -> Result<EntryId> {
    for attempt in 0..2 {
        match existing {
            Some(current) => {
                let updated = JournalEntry {
                    text: text.clone(),
                    icon_type,
                    icon_variant: roll_variant(cosmetics),
                    ..current
                };
                match store.update(&updated) {
                    Ok(()) => return Ok(updated.id),
                    Err(CoreError::NotFound { id }) => {
                        tracing::warn!(id, date_key = %date_key, attempt, "entry vanished before update, inserting");
                        existing = None;
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {
                let (icon_variant, grid_x, grid_y) = roll_new(cosmetics);
                let entry = NewEntry {
                    text: text.clone(),
                    timestamp,
                    icon_type,
                    icon_variant,
                    grid_x,
                    grid_y,
                };
                match store.insert(&entry) {
                    Ok(id) => return Ok(id),
                    Err(CoreError::Conflict { .. }) => {
                        tracing::warn!(date_key = %date_key, attempt, "lost same-day insert race, updating instead");
                        existing = store.get_by_local_date(&date_key)?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Err(StorageError::RetryExhausted { date_key }.into())
}
