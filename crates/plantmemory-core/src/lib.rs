//! # Plant Memory Core Library
//!
//! The one-entry-per-day journal store behind Plant Memory. A user records
//! one short memory per calendar day; each memory carries an icon category
//! and a few random cosmetic attributes, and the entries are shown as a
//! year-long garden and in home-screen widgets.
//!
//! ## Architecture
//!
//! - **Entry Store**: SQLite table of journal entries with a UNIQUE local
//!   date key, plus ordered, per-year and aggregate queries
//! - **Live queries**: every read can be subscribed to and re-delivers its
//!   full result after each committed write
//! - **Journal Service**: the find-then-upsert rule, cosmetic randomness,
//!   days-of-growth, snapshot reads for pollers and live reads for screens
//!
//! ## Key Components
//!
//! - [`EntryStore`]: persistence and queries
//! - [`JournalService`]: the only write path for consumers
//! - [`LiveQuery`]: subscription handle
//! - [`Config`]: application configuration

pub mod calendar;
pub mod clock;
pub mod cosmetics;
pub mod entry;
pub mod error;
pub mod garden;
pub mod icon;
pub mod live;
pub mod service;
pub mod storage;

pub use calendar::LocalZone;
pub use clock::{Clock, FixedClock, SystemClock};
pub use cosmetics::{CosmeticSource, RandomCosmetics, ScriptedCosmetics};
pub use entry::{EntryId, JournalEntry, NewEntry};
pub use error::{ConfigError, CoreError, Result, StorageError, ValidationError};
pub use garden::{DayGroup, GardenView};
pub use icon::IconType;
pub use live::LiveQuery;
pub use service::JournalService;
pub use storage::{Config, EntryStore};
