//! Local-calendar derivation for epoch-millisecond timestamps.
//!
//! The `YYYY-MM-DD` date key is the uniqueness key of the journal. Every
//! conversion from an instant to a calendar day goes through [`LocalZone`],
//! and the store owns exactly one zone, so the write-path lookup and the
//! read-path display always agree on which day an entry belongs to.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
};

use crate::error::ValidationError;

/// Milliseconds in one day.
pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Earliest accepted instant, 0001-01-01T00:00:00Z.
pub const MIN_TIMESTAMP_MS: i64 = -62_135_596_800_000;
/// Latest accepted instant, 9999-12-31T23:59:59.999Z.
pub const MAX_TIMESTAMP_MS: i64 = 253_402_300_799_999;

/// Reject instants whose calendar day cannot be represented.
///
/// Every write path calls this before deriving a date key.
pub fn check_timestamp(timestamp_ms: i64) -> Result<i64, ValidationError> {
    if (MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&timestamp_ms) {
        Ok(timestamp_ms)
    } else {
        Err(ValidationError::InvalidValue {
            field: "timestamp".into(),
            message: format!("{timestamp_ms} is outside years 1..=9999"),
        })
    }
}

/// Timezone used to turn instants into calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    /// The device's zone, as reported by the OS.
    #[default]
    System,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
}

impl LocalZone {
    /// Fixed zone from an offset in minutes east of UTC.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, ValidationError> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(LocalZone::Fixed)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "utc_offset_minutes".into(),
                message: format!("{minutes} is outside +/-24h"),
            })
    }

    pub fn utc() -> Self {
        LocalZone::Fixed(Utc.fix())
    }

    /// The instant as a date-time with the zone's offset applied.
    ///
    /// Callers pass instants already accepted by [`check_timestamp`].
    fn localize(self, timestamp_ms: i64) -> DateTime<FixedOffset> {
        let utc = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or_default();
        match self {
            LocalZone::System => utc.with_timezone(&Local).fixed_offset(),
            LocalZone::Fixed(offset) => utc.with_timezone(&offset),
        }
    }

    /// Calendar date the instant falls on.
    pub fn local_date(self, timestamp_ms: i64) -> NaiveDate {
        self.localize(timestamp_ms).date_naive()
    }

    /// `YYYY-MM-DD` key of the instant's local date.
    pub fn date_key(self, timestamp_ms: i64) -> String {
        self.local_date(timestamp_ms).format(DATE_KEY_FORMAT).to_string()
    }

    /// Local calendar year of the instant.
    pub fn local_year(self, timestamp_ms: i64) -> i32 {
        self.local_date(timestamp_ms).year()
    }

    /// Instant of 12:00 local time on `date`.
    ///
    /// Used as the canonical timestamp when a consumer picks a day rather than
    /// an instant; noon stays on the same date across DST shifts.
    pub fn local_noon(self, date: NaiveDate) -> i64 {
        let naive = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
        match self {
            LocalZone::System => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.timestamp_millis())
                .unwrap_or_else(|| naive.and_utc().timestamp_millis()),
            LocalZone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.timestamp_millis())
                .unwrap_or_else(|| naive.and_utc().timestamp_millis()),
        }
    }

    /// Same local time of day, one calendar day earlier.
    pub fn previous_day(self, timestamp_ms: i64) -> i64 {
        let date = self.local_date(timestamp_ms) - Duration::days(1);
        self.local_noon(date)
    }

    /// One calendar day later, unless that day is after `now_ms`'s day.
    pub fn next_day(self, timestamp_ms: i64, now_ms: i64) -> Option<i64> {
        let date = self.local_date(timestamp_ms) + Duration::days(1);
        if date > self.local_date(now_ms) {
            return None;
        }
        Some(self.local_noon(date).min(now_ms))
    }
}

/// Parse a `YYYY-MM-DD` key.
pub fn parse_date_key(key: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT).map_err(|e| {
        ValidationError::InvalidValue {
            field: "date".into(),
            message: format!("'{key}' is not YYYY-MM-DD: {e}"),
        }
    })
}
