//! Persistence ports and the bundled in-memory datastore.
//!
//! The engine talks to persistence through four narrow traits:
//! [`CategoryStore`], [`TrackerStore`], [`RecordStore`] and [`PinnedStore`].
//! Each supports fetching everything, adding, deleting, and registering a
//! channel that receives a [`StoreChange`] after every successful mutation.
//!
//! # Design
//!
//! Ports take `&self` and use interior mutability, so one datastore can be
//! shared by several models. Notifications go through `std::sync::mpsc`
//! channels: a store may be written from any thread, while the receiving
//! model drains its channel on its own thread.
//!
//! [`MemoryStore`] is the in-memory implementation. It holds trackers,
//! categories, completion records and pins in one table set so that
//! referential checks (`TrackerNotFound`) and cascading deletes work across
//! ports, and it can snapshot itself to JSON.
//!
//! # Example
//!
//! ```rust
//! use tracker_core::store::{MemoryStore, TrackerStore, CategoryStore};
//! use tracker_core::{Schedule, Tracker, TrackerCategory, TrackerColor};
//!
//! let store = MemoryStore::new();
//! let color = TrackerColor::from_rgba(0, 0, 0, 255);
//! let tracker = Tracker::new("Run", color, "🏃", Schedule::every_day());
//!
//! store.tracker_store().add(&tracker).unwrap();
//! store
//!     .category_store()
//!     .add(&TrackerCategory::new("Health", vec![tracker]))
//!     .unwrap();
//!
//! let categories = store.category_store().fetch_all().unwrap();
//! assert_eq!(categories[0].trackers.len(), 1);
//! ```

use crate::entities::{CompletionRecord, PinnedMarker, Tracker, TrackerCategory, TrackerId};
use crate::error::{StoreError, StoreResult};
use crate::pin::{toggle_pin, PinChange};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// Change notifications
// ============================================================================

/// Which port's contents changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreChange {
    Categories,
    Trackers,
    Records,
    Pinned,
}

/// Fan-out of change notifications to every registered channel.
///
/// Channels whose receiver has been dropped are pruned on the next send.
#[derive(Debug, Default)]
pub struct ChangeHub {
    senders: Mutex<Vec<Sender<StoreChange>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sender: Sender<StoreChange>) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
    }

    pub fn notify(&self, change: StoreChange) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|sender| sender.send(change).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ============================================================================
// Port traits
// ============================================================================

pub trait CategoryStore {
    /// All categories, including empty ones, each with its trackers.
    fn fetch_all(&self) -> StoreResult<Vec<TrackerCategory>>;

    /// Create an empty category. Creating an existing title is a no-op.
    fn create(&self, title: &str) -> StoreResult<()>;

    /// Merge `category` by title: create it if needed and attach each of its
    /// trackers, inserting unknown ones and moving known ones.
    fn add(&self, category: &TrackerCategory) -> StoreResult<()>;

    /// Delete the category and every tracker in it.
    fn delete(&self, category: &TrackerCategory) -> StoreResult<()>;

    fn subscribe(&self, sender: Sender<StoreChange>);
}

pub trait TrackerStore {
    fn fetch_all(&self) -> StoreResult<Vec<Tracker>>;

    /// Insert `tracker`, or replace the attributes of a tracker with the same id.
    fn add(&self, tracker: &Tracker) -> StoreResult<()>;

    /// Replace the attributes of an existing tracker.
    fn update(&self, tracker: &Tracker) -> StoreResult<()>;

    /// Delete the tracker along with its completion records and pin.
    fn delete(&self, tracker: &Tracker) -> StoreResult<()>;

    fn subscribe(&self, sender: Sender<StoreChange>);
}

pub trait RecordStore {
    fn fetch_all(&self) -> StoreResult<Vec<CompletionRecord>>;

    fn fetch_for(&self, tracker_id: TrackerId) -> StoreResult<Vec<CompletionRecord>> {
        Ok(self
            .fetch_all()?
            .into_iter()
            .filter(|r| r.tracker_id == tracker_id)
            .collect())
    }

    /// Fails with `TrackerNotFound` when the tracker is unknown.
    fn add(&self, record: &CompletionRecord) -> StoreResult<()>;

    /// Delete records with the same tracker id and exact date.
    fn delete(&self, record: &CompletionRecord) -> StoreResult<()>;

    fn subscribe(&self, sender: Sender<StoreChange>);
}

pub trait PinnedStore {
    fn fetch_all(&self) -> StoreResult<Vec<PinnedMarker>>;

    /// Fails with `TrackerNotFound` when the tracker is unknown.
    fn add(&self, marker: &PinnedMarker) -> StoreResult<()>;

    /// Delete every marker for the marker's tracker.
    fn delete(&self, marker: &PinnedMarker) -> StoreResult<()>;

    /// Pin the marker's tracker if unpinned, unpin it otherwise.
    fn toggle(&self, marker: &PinnedMarker) -> StoreResult<()> {
        let pinned = self.fetch_all()?;
        match toggle_pin(&marker.tracker, marker.pinned_at, &pinned) {
            PinChange::Pin(marker) => self.add(&marker),
            PinChange::Unpin(markers) => {
                for marker in &markers {
                    self.delete(marker)?;
                }
                Ok(())
            }
        }
    }

    fn subscribe(&self, sender: Sender<StoreChange>);
}

// ============================================================================
// MemoryStore: always-public for consumers and tests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTracker {
    tracker: Tracker,
    category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPin {
    tracker_id: TrackerId,
    pinned_at: DateTime<Local>,
}

/// Table set behind [`MemoryStore`]. This is also the JSON snapshot shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    trackers: Vec<StoredTracker>,
    #[serde(default)]
    records: Vec<CompletionRecord>,
    #[serde(default)]
    pinned: Vec<StoredPin>,
}

impl Tables {
    fn tracker(&self, id: TrackerId) -> Option<&StoredTracker> {
        self.trackers.iter().find(|t| t.tracker.id == id)
    }

    fn ensure_category(&mut self, title: &str) -> bool {
        if self.categories.iter().any(|c| c == title) {
            return false;
        }
        self.categories.push(title.to_string());
        true
    }

    /// Remove trackers and everything that references them.
    /// Returns the set of ports that changed.
    fn remove_trackers(&mut self, ids: &HashSet<TrackerId>) -> Vec<StoreChange> {
        let mut changes = Vec::new();

        let before = self.trackers.len();
        self.trackers.retain(|t| !ids.contains(&t.tracker.id));
        if self.trackers.len() != before {
            changes.push(StoreChange::Trackers);
            changes.push(StoreChange::Categories);
        }

        let before = self.records.len();
        self.records.retain(|r| !ids.contains(&r.tracker_id));
        if self.records.len() != before {
            changes.push(StoreChange::Records);
        }

        let before = self.pinned.len();
        self.pinned.retain(|p| !ids.contains(&p.tracker_id));
        if self.pinned.len() != before {
            changes.push(StoreChange::Pinned);
        }

        changes
    }

    fn is_pinned(&self, id: TrackerId) -> bool {
        self.pinned.iter().any(|p| p.tracker_id == id)
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    categories: ChangeHub,
    trackers: ChangeHub,
    records: ChangeHub,
    pinned: ChangeHub,
}

/// In-memory datastore shared by the four port adapters.
///
/// Cloning is cheap and yields a handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a datastore from a snapshot produced by [`MemoryStore::to_json`].
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let tables: Tables = serde_json::from_str(json)?;
        Ok(Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(tables),
                ..Shared::default()
            }),
        })
    }

    pub fn to_json(&self) -> StoreResult<String> {
        let tables = self.tables()?;
        Ok(serde_json::to_string_pretty(&*tables)?)
    }

    pub fn category_store(&self) -> MemoryCategoryStore {
        MemoryCategoryStore(self.clone())
    }

    pub fn tracker_store(&self) -> MemoryTrackerStore {
        MemoryTrackerStore(self.clone())
    }

    pub fn record_store(&self) -> MemoryRecordStore {
        MemoryRecordStore(self.clone())
    }

    pub fn pinned_store(&self) -> MemoryPinnedStore {
        MemoryPinnedStore(self.clone())
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.shared
            .tables
            .lock()
            .map_err(|_| StoreError::SaveFailed("datastore lock poisoned".to_string()))
    }

    fn hub(&self, change: StoreChange) -> &ChangeHub {
        match change {
            StoreChange::Categories => &self.shared.categories,
            StoreChange::Trackers => &self.shared.trackers,
            StoreChange::Records => &self.shared.records,
            StoreChange::Pinned => &self.shared.pinned,
        }
    }

    /// Send one notification per distinct changed port. Called with the
    /// table lock released.
    fn notify(&self, changes: &[StoreChange]) {
        let mut sent = HashSet::new();
        for change in changes {
            if sent.insert(*change) {
                self.hub(*change).notify(*change);
            }
        }
    }
}

/// [`CategoryStore`] over a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryCategoryStore(MemoryStore);

/// [`TrackerStore`] over a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryTrackerStore(MemoryStore);

/// [`RecordStore`] over a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryRecordStore(MemoryStore);

/// [`PinnedStore`] over a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryPinnedStore(MemoryStore);

impl CategoryStore for MemoryCategoryStore {
    fn fetch_all(&self) -> StoreResult<Vec<TrackerCategory>> {
        let tables = self.0.tables()?;
        let mut categories: Vec<TrackerCategory> = tables
            .categories
            .iter()
            .map(|title| {
                let mut trackers: Vec<Tracker> = tables
                    .trackers
                    .iter()
                    .filter(|t| t.category.as_deref() == Some(title.as_str()))
                    .map(|t| t.tracker.clone())
                    .collect();
                trackers.sort_by(|a, b| a.name.cmp(&b.name));
                TrackerCategory::new(title.clone(), trackers)
            })
            .collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }

    fn create(&self, title: &str) -> StoreResult<()> {
        let created = self.0.tables()?.ensure_category(title);
        if created {
            self.0.notify(&[StoreChange::Categories]);
        }
        Ok(())
    }

    fn add(&self, category: &TrackerCategory) -> StoreResult<()> {
        if let Some(invalid) = category.trackers.iter().find(|t| !t.is_valid()) {
            return Err(StoreError::InvalidTracker(format!(
                "tracker {} has an empty name",
                invalid.id
            )));
        }

        let mut changes = Vec::new();
        {
            let mut tables = self.0.tables()?;
            if tables.ensure_category(&category.title) {
                changes.push(StoreChange::Categories);
            }

            for tracker in &category.trackers {
                let pinned = tables.is_pinned(tracker.id);
                match tables.trackers.iter().position(|t| t.tracker.id == tracker.id) {
                    Some(index) => {
                        let stored = &mut tables.trackers[index];
                        if stored.tracker == *tracker
                            && stored.category.as_deref() == Some(category.title.as_str())
                        {
                            continue;
                        }
                        stored.tracker = tracker.clone();
                        stored.category = Some(category.title.clone());
                    }
                    None => tables.trackers.push(StoredTracker {
                        tracker: tracker.clone(),
                        category: Some(category.title.clone()),
                    }),
                }
                changes.push(StoreChange::Trackers);
                changes.push(StoreChange::Categories);
                if pinned {
                    changes.push(StoreChange::Pinned);
                }
            }
        }
        self.0.notify(&changes);
        Ok(())
    }

    fn delete(&self, category: &TrackerCategory) -> StoreResult<()> {
        let changes = {
            let mut tables = self.0.tables()?;
            let before = tables.categories.len();
            tables.categories.retain(|c| *c != category.title);
            if tables.categories.len() == before {
                return Err(StoreError::CategoryNotFound {
                    title: category.title.clone(),
                });
            }

            let ids: HashSet<TrackerId> = tables
                .trackers
                .iter()
                .filter(|t| t.category.as_deref() == Some(category.title.as_str()))
                .map(|t| t.tracker.id)
                .collect();
            let mut changes = tables.remove_trackers(&ids);
            changes.push(StoreChange::Categories);
            changes
        };
        self.0.notify(&changes);
        Ok(())
    }

    fn subscribe(&self, sender: Sender<StoreChange>) {
        self.0.shared.categories.subscribe(sender);
    }
}

impl TrackerStore for MemoryTrackerStore {
    fn fetch_all(&self) -> StoreResult<Vec<Tracker>> {
        let tables = self.0.tables()?;
        let mut trackers: Vec<Tracker> =
            tables.trackers.iter().map(|t| t.tracker.clone()).collect();
        trackers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(trackers)
    }

    fn add(&self, tracker: &Tracker) -> StoreResult<()> {
        if !tracker.is_valid() {
            return Err(StoreError::InvalidTracker(format!(
                "tracker {} has an empty name",
                tracker.id
            )));
        }

        let mut changes = vec![StoreChange::Trackers];
        {
            let mut tables = self.0.tables()?;
            let pinned = tables.is_pinned(tracker.id);
            match tables.trackers.iter().position(|t| t.tracker.id == tracker.id) {
                Some(index) => {
                    let stored = &mut tables.trackers[index];
                    stored.tracker = tracker.clone();
                    if stored.category.is_some() {
                        changes.push(StoreChange::Categories);
                    }
                    if pinned {
                        changes.push(StoreChange::Pinned);
                    }
                }
                None => tables.trackers.push(StoredTracker {
                    tracker: tracker.clone(),
                    category: None,
                }),
            }
        }
        self.0.notify(&changes);
        Ok(())
    }

    fn update(&self, tracker: &Tracker) -> StoreResult<()> {
        if self.0.tables()?.tracker(tracker.id).is_none() {
            return Err(StoreError::TrackerNotFound { id: tracker.id });
        }
        self.add(tracker)
    }

    fn delete(&self, tracker: &Tracker) -> StoreResult<()> {
        let changes = {
            let mut tables = self.0.tables()?;
            let ids = HashSet::from([tracker.id]);
            tables.remove_trackers(&ids)
        };
        self.0.notify(&changes);
        Ok(())
    }

    fn subscribe(&self, sender: Sender<StoreChange>) {
        self.0.shared.trackers.subscribe(sender);
    }
}

impl RecordStore for MemoryRecordStore {
    fn fetch_all(&self) -> StoreResult<Vec<CompletionRecord>> {
        let tables = self.0.tables()?;
        let mut records: Vec<CompletionRecord> = tables
            .records
            .iter()
            .filter(|r| tables.tracker(r.tracker_id).is_some())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(records)
    }

    fn add(&self, record: &CompletionRecord) -> StoreResult<()> {
        {
            let mut tables = self.0.tables()?;
            if tables.tracker(record.tracker_id).is_none() {
                return Err(StoreError::TrackerNotFound {
                    id: record.tracker_id,
                });
            }
            tables.records.push(record.clone());
        }
        self.0.notify(&[StoreChange::Records]);
        Ok(())
    }

    fn delete(&self, record: &CompletionRecord) -> StoreResult<()> {
        let removed = {
            let mut tables = self.0.tables()?;
            let before = tables.records.len();
            tables.records.retain(|r| r != record);
            tables.records.len() != before
        };
        if removed {
            self.0.notify(&[StoreChange::Records]);
        }
        Ok(())
    }

    fn subscribe(&self, sender: Sender<StoreChange>) {
        self.0.shared.records.subscribe(sender);
    }
}

impl PinnedStore for MemoryPinnedStore {
    fn fetch_all(&self) -> StoreResult<Vec<PinnedMarker>> {
        let tables = self.0.tables()?;
        let mut pinned: Vec<PinnedMarker> = tables
            .pinned
            .iter()
            .filter_map(|p| {
                tables
                    .tracker(p.tracker_id)
                    .map(|t| PinnedMarker::new(t.tracker.clone(), p.pinned_at))
            })
            .collect();
        pinned.sort_by(|a, b| a.pinned_at.cmp(&b.pinned_at));
        Ok(pinned)
    }

    fn add(&self, marker: &PinnedMarker) -> StoreResult<()> {
        {
            let mut tables = self.0.tables()?;
            if tables.tracker(marker.tracker_id()).is_none() {
                return Err(StoreError::TrackerNotFound {
                    id: marker.tracker_id(),
                });
            }
            tables.pinned.push(StoredPin {
                tracker_id: marker.tracker_id(),
                pinned_at: marker.pinned_at,
            });
        }
        self.0.notify(&[StoreChange::Pinned]);
        Ok(())
    }

    fn delete(&self, marker: &PinnedMarker) -> StoreResult<()> {
        let removed = {
            let mut tables = self.0.tables()?;
            let before = tables.pinned.len();
            tables.pinned.retain(|p| p.tracker_id != marker.tracker_id());
            tables.pinned.len() != before
        };
        if removed {
            self.0.notify(&[StoreChange::Pinned]);
        }
        Ok(())
    }

    fn subscribe(&self, sender: Sender<StoreChange>) {
        self.0.shared.pinned.subscribe(sender);
    }
}

// ============================================================================
// Tests
// ============================================================================
