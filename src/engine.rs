//! The long-lived tracker engine behind the main screen.
//!
//! [`TrackerEngine`] owns the user's current query (selected date, search
//! text, filter) and read snapshots of the raw collections. Any change to
//! the query, or any [`StoreChange`] received from the ports, triggers a
//! full synchronous recompute of the display list, which is then pushed to
//! every subscriber.
//!
//! Mutations (`toggle_completion`, `toggle_pin`, `add_tracker`, ...) go
//! through the ports only. The display list is refreshed by the change
//! notifications they produce, drained by [`TrackerEngine::process_changes`]
//! before each mutation returns.

use crate::calendar::Clock;
use crate::completion::{self, CompletionChange};
use crate::config::TrackerConfig;
use crate::entities::{CompletionRecord, PinnedMarker, Tracker, TrackerCategory, TrackerId};
use crate::error::{StoreError, StoreResult};
use crate::filter::{self, TrackerFilter};
use crate::observe::{Subscribers, SubscriptionId};
use crate::pin;
use crate::store::{
    CategoryStore, MemoryStore, PinnedStore, RecordStore, StoreChange, TrackerStore,
};
use crate::visibility::{compute_visible, VisibilityQuery};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// The four persistence ports the engine reads and writes through.
#[derive(Clone)]
pub struct Stores {
    pub categories: Arc<dyn CategoryStore>,
    pub trackers: Arc<dyn TrackerStore>,
    pub records: Arc<dyn RecordStore>,
    pub pinned: Arc<dyn PinnedStore>,
}

impl Stores {
    /// Ports backed by one shared [`MemoryStore`].
    pub fn memory(store: &MemoryStore) -> Self {
        Self {
            categories: Arc::new(store.category_store()),
            trackers: Arc::new(store.tracker_store()),
            records: Arc::new(store.record_store()),
            pinned: Arc::new(store.pinned_store()),
        }
    }
}

/// Raw collections fetched from the ports during a reload.
#[derive(Default)]
struct Snapshot {
    categories: Option<Vec<TrackerCategory>>,
    records: Option<Vec<CompletionRecord>>,
    pinned: Option<Vec<PinnedMarker>>,
}

pub struct TrackerEngine {
    stores: Stores,
    clock: Arc<dyn Clock>,
    pinned_title: String,
    changes: Receiver<StoreChange>,

    categories: Vec<TrackerCategory>,
    records: Vec<CompletionRecord>,
    pinned: Vec<PinnedMarker>,

    selected_date: DateTime<Local>,
    search_text: String,
    filter: TrackerFilter,

    visible: Vec<TrackerCategory>,
    subscribers: Subscribers<Vec<TrackerCategory>>,
}

impl TrackerEngine {
    /// Register with every port, load all collections and compute the first
    /// display list. The selected date starts at the clock's current day.
    pub fn new(stores: Stores, clock: Arc<dyn Clock>, config: &TrackerConfig) -> Self {
        let (sender, changes) = mpsc::channel();
        stores.categories.subscribe(sender.clone());
        stores.trackers.subscribe(sender.clone());
        stores.records.subscribe(sender.clone());
        stores.pinned.subscribe(sender);

        let selected_date = clock.now();
        let mut engine = Self {
            stores,
            clock,
            pinned_title: config.pinned_category_title.clone(),
            changes,
            categories: Vec::new(),
            records: Vec::new(),
            pinned: Vec::new(),
            selected_date,
            search_text: String::new(),
            filter: TrackerFilter::All,
            visible: Vec::new(),
            subscribers: Subscribers::new(),
        };

        let everything = HashSet::from([
            StoreChange::Categories,
            StoreChange::Records,
            StoreChange::Pinned,
        ]);
        engine.reload(&everything);
        engine.recompute();
        engine
    }

    // ========================================================================
    // Query inputs
    // ========================================================================

    pub fn set_selected_date(&mut self, date: DateTime<Local>) {
        self.selected_date = date;
        self.recompute();
    }

    pub fn search(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.recompute();
    }

    /// Change the active filter. Selecting [`TrackerFilter::Today`] also
    /// moves the selected date to the current day.
    pub fn set_filter(&mut self, filter: TrackerFilter) {
        if filter.forces_today() {
            self.selected_date = self.clock.now();
        }
        self.filter = filter;
        self.recompute();
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    /// Receive the display list now and after every recompute.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&Vec<TrackerCategory>) + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(&self.visible, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn visible_categories(&self) -> &[TrackerCategory] {
        &self.visible
    }

    /// Every stored category, before any visibility rule.
    pub fn all_categories(&self) -> &[TrackerCategory] {
        &self.categories
    }

    pub fn selected_date(&self) -> DateTime<Local> {
        self.selected_date
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn current_filter(&self) -> TrackerFilter {
        self.filter
    }

    pub fn is_filter_applied(&self) -> bool {
        filter::is_filter_applied(&self.search_text, self.filter)
    }

    /// Whether the tracker is done on the selected date.
    pub fn is_completed(&self, tracker_id: TrackerId) -> bool {
        completion::is_completed_on(tracker_id, &self.selected_date, &self.records)
    }

    pub fn completed_days(&self, tracker_id: TrackerId) -> usize {
        completion::completed_count(tracker_id, &self.records)
    }

    pub fn is_pinned(&self, tracker_id: TrackerId) -> bool {
        pin::is_pinned(tracker_id, &self.pinned)
    }

    /// The stored category a tracker belongs to, used by the edit flow.
    pub fn category_of(&self, tracker_id: TrackerId) -> Option<&TrackerCategory> {
        self.categories.iter().find(|c| c.contains(tracker_id))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Flip completion of `tracker_id` on the selected date.
    ///
    /// The flip is decided from the records currently held by the store, so
    /// writes made by other models since the last drain are respected.
    pub fn toggle_completion(&mut self, tracker_id: TrackerId) -> StoreResult<()> {
        let result = self
            .stores
            .records
            .fetch_for(tracker_id)
            .and_then(|existing| {
                let change =
                    completion::toggle_completion(tracker_id, self.selected_date, &existing);
                self.apply_completion(&change)
            });
        self.finish("toggle_completion", result)
    }

    /// Flip the pinned state of `tracker` against the store's current pins.
    pub fn toggle_pin(&mut self, tracker: &Tracker) -> StoreResult<()> {
        let marker = PinnedMarker::new(tracker.clone(), self.clock.now());
        let result = self.stores.pinned.toggle(&marker);
        self.finish("toggle_pin", result)
    }

    /// Store a new tracker under `category_title`, creating the category if needed.
    pub fn add_tracker(&mut self, tracker: Tracker, category_title: &str) -> StoreResult<()> {
        let result = self.store_tracker(tracker, category_title, false);
        self.finish("add_tracker", result)
    }

    /// Replace a tracker's attributes and move it to `category_title`.
    /// Completion history and pin state are kept.
    pub fn edit_tracker(&mut self, tracker: Tracker, category_title: &str) -> StoreResult<()> {
        let result = self.store_tracker(tracker, category_title, true);
        self.finish("edit_tracker", result)
    }

    /// Delete a tracker together with its records and pin.
    pub fn delete_tracker(&mut self, tracker: &Tracker) -> StoreResult<()> {
        let result = self.stores.trackers.delete(tracker);
        self.finish("delete_tracker", result)
    }

    // ========================================================================
    // Change propagation
    // ========================================================================

    /// Drain pending store notifications, reload what changed and recompute
    /// once. Returns the number of distinct changes handled.
    pub fn process_changes(&mut self) -> usize {
        let pending: HashSet<StoreChange> = self.changes.try_iter().collect();
        if pending.is_empty() {
            return 0;
        }
        if self.reload(&pending) {
            self.recompute();
        }
        pending.len()
    }

    fn finish(&mut self, action: &str, result: StoreResult<()>) -> StoreResult<()> {
        if let Err(error) = &result {
            tracing::warn!(action, error = %error, "tracker mutation failed");
        }
        self.process_changes();
        result
    }

    fn apply_completion(&self, change: &CompletionChange) -> StoreResult<()> {
        for record in &change.remove {
            self.stores.records.delete(record)?;
        }
        if let Some(record) = &change.add {
            self.stores.records.add(record)?;
        }
        Ok(())
    }

    /// Write `tracker` and its category membership in one category merge,
    /// so a tracker is never stored without a category.
    fn store_tracker(
        &self,
        tracker: Tracker,
        category_title: &str,
        existing: bool,
    ) -> StoreResult<()> {
        if !tracker.is_valid() {
            return Err(StoreError::InvalidTracker(format!(
                "tracker {} has an empty name",
                tracker.id
            )));
        }
        if category_title.trim().is_empty() {
            return Err(StoreError::InvalidCategory("empty category title".to_string()));
        }
        if existing && !self.stores.trackers.fetch_all()?.iter().any(|t| t.id == tracker.id) {
            return Err(StoreError::TrackerNotFound { id: tracker.id });
        }

        self.stores
            .categories
            .add(&TrackerCategory::new(category_title, vec![tracker]))
    }

    /// Fetch the collections affected by `changes`. Either every fetch
    /// succeeds and the snapshot is applied, or nothing changes.
    fn reload(&mut self, changes: &HashSet<StoreChange>) -> bool {
        match self.fetch(changes) {
            Ok(snapshot) => {
                if let Some(categories) = snapshot.categories {
                    self.categories = categories;
                }
                if let Some(records) = snapshot.records {
                    self.records = records;
                }
                if let Some(pinned) = snapshot.pinned {
                    self.pinned = pinned;
                }
                tracing::debug!(?changes, "reloaded tracker collections");
                true
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to reload trackers, keeping previous list");
                false
            }
        }
    }

    fn fetch(&self, changes: &HashSet<StoreChange>) -> StoreResult<Snapshot> {
        let mut snapshot = Snapshot::default();
        if changes.contains(&StoreChange::Categories) || changes.contains(&StoreChange::Trackers) {
            snapshot.categories = Some(self.stores.categories.fetch_all()?);
        }
        if changes.contains(&StoreChange::Records) {
            snapshot.records = Some(self.stores.records.fetch_all()?);
        }
        if changes.contains(&StoreChange::Pinned) {
            snapshot.pinned = Some(self.stores.pinned.fetch_all()?);
        }
        Ok(snapshot)
    }

    fn recompute(&mut self) {
        let query = VisibilityQuery::new(self.selected_date)
            .with_search(&self.search_text)
            .with_filter(self.filter)
            .with_pinned_title(&self.pinned_title);
        self.visible = compute_visible(&self.categories, &self.records, &self.pinned, &query);
        tracing::debug!(
            categories = self.visible.len(),
            filter = %self.filter,
            "recomputed visible trackers"
        );
        self.subscribers.publish(&self.visible);
    }
}
