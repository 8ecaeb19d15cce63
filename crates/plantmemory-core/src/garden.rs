//! Garden read model: one year of entries grouped by day, plus the
//! header figures shown above it.

use serde::Serialize;

use crate::entry::JournalEntry;
use crate::error::Result;
use crate::service::{days_of_growth, years_with_current};
use crate::storage::EntryStore;

/// Entries sharing one local date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup {
    pub date_key: String,
    /// e.g. `"monday, 10.27"`
    pub day_label: String,
    /// e.g. `"October 2025"`
    pub month_label: String,
    pub entries: Vec<JournalEntry>,
}

/// Everything the garden screen renders for one selected year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GardenView {
    pub selected_year: i32,
    /// Years with entries plus the current year, newest first.
    pub available_years: Vec<i32>,
    /// Selected year only, oldest first.
    pub entries: Vec<JournalEntry>,
    pub days: Vec<DayGroup>,
    /// Across all years.
    pub entry_count: u64,
    pub days_of_growth: u32,
}

pub(crate) fn build(store: &EntryStore, year: i32, now_ms: i64) -> Result<GardenView> {
    let zone = store.zone();
    let mut entries = store.by_year(year)?;
    entries.reverse();

    let mut days: Vec<DayGroup> = Vec::new();
    for entry in &entries {
        let date = zone.local_date(entry.timestamp);
        let date_key = date.format("%Y-%m-%d").to_string();
        match days.last_mut() {
            Some(group) if group.date_key == date_key => group.entries.push(entry.clone()),
            _ => days.push(DayGroup {
                date_key,
                day_label: date.format("%A, %m.%d").to_string().to_lowercase(),
                month_label: date.format("%B %Y").to_string(),
                entries: vec![entry.clone()],
            }),
        }
    }

    Ok(GardenView {
        selected_year: year,
        available_years: years_with_current(store, zone.local_year(now_ms))?,
        entries,
        days,
        entry_count: store.count()?,
        days_of_growth: days_of_growth(store.min_timestamp()?, now_ms),
    })
}

/// Year to show after deleting an entry from `deleted_year`.
///
/// Deleting from a past year that is currently selected jumps back to the
/// current year, so the screen never lands on a year that may now be empty.
pub fn fallback_year(deleted_year: i32, selected_year: i32, current_year: i32) -> i32 {
    if deleted_year != current_year && selected_year == deleted_year {
        current_year
    } else {
        selected_year
    }
}
