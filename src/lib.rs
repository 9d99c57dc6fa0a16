//! Tracker Core Library
//!
//! This library provides the core domain model and logic for a personal habit
//! and event tracker. It is designed to be consumed by any frontend (mobile,
//! desktop, CLI) without containing frontend-specific concerns.
//!
//! # Modules
//!
//! - `entities`: Core domain types (Tracker, TrackerCategory, CompletionRecord, PinnedMarker)
//! - `calendar`: Day comparison, weekday mapping and the injectable clock
//! - `filter`: The main-screen filter options
//! - `visibility`: Derives the grouped list of visible trackers
//! - `completion`: Completion toggle and counts
//! - `pin`: Pin toggle
//! - `store`: Persistence ports and the in-memory datastore
//! - `observe`: Listener registry used by the models
//! - `engine`: The main-screen engine tying query, ports and visibility together
//! - `statistics`: Completed-trackers count
//! - `categories`: Category picker model
//! - `config`: Application settings
//! - `app`: Composition root

pub mod entities;
pub use entities::{
    CompletionRecord, PinnedMarker, Schedule, Tracker, TrackerCategory, TrackerColor, TrackerId,
    TrackerKind, WeekDay,
};

pub mod error;
pub use error::{ConfigError, StoreError, StoreResult};

pub mod calendar;
pub use calendar::{Clock, FixedClock, SystemClock};

pub mod filter;
pub use filter::TrackerFilter;

pub mod visibility;
pub use visibility::{compute_visible, VisibilityQuery, PINNED_CATEGORY_TITLE};

pub mod completion;

pub mod pin;

pub mod store;
pub use store::{CategoryStore, MemoryStore, PinnedStore, RecordStore, StoreChange, TrackerStore};

pub mod observe;
pub use observe::SubscriptionId;

pub mod engine;
pub use engine::{Stores, TrackerEngine};

pub mod statistics;
pub use statistics::StatisticsModel;

pub mod categories;
pub use categories::CategoriesModel;

pub mod config;
pub use config::TrackerConfig;

pub mod app;
pub use app::{AppContext, InitialScreen};
