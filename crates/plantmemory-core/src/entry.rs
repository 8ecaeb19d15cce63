use serde::{Deserialize, Serialize};

use crate::calendar::LocalZone;
use crate::icon::IconType;

/// Row id assigned by the store.
pub type EntryId = i64;

/// One day's memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub text: String,
    /// Epoch milliseconds; its local date is the entry's day.
    pub timestamp: i64,
    pub icon_type: IconType,
    /// Cosmetic sub-selector, 1..=8.
    pub icon_variant: u8,
    pub grid_x: f32,
    pub grid_y: f32,
}

/// An entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub text: String,
    pub timestamp: i64,
    pub icon_type: IconType,
    pub icon_variant: u8,
    pub grid_x: f32,
    pub grid_y: f32,
}

impl NewEntry {
    pub fn into_entry(self, id: EntryId) -> JournalEntry {
        JournalEntry {
            id,
            text: self.text,
            timestamp: self.timestamp,
            icon_type: self.icon_type,
            icon_variant: self.icon_variant,
            grid_x: self.grid_x,
            grid_y: self.grid_y,
        }
    }
}

impl JournalEntry {
    pub fn date_key(&self, zone: LocalZone) -> String {
        zone.date_key(self.timestamp)
    }

    pub fn local_year(&self, zone: LocalZone) -> i32 {
        zone.local_year(self.timestamp)
    }
}
