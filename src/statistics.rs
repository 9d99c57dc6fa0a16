use crate::completion;
use crate::error::StoreResult;
use crate::observe::{Subscribers, SubscriptionId};
use crate::store::{RecordStore, StoreChange};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// Backs the statistics screen: the number of completed tracker-days.
pub struct StatisticsModel {
    records: Arc<dyn RecordStore>,
    changes: Receiver<StoreChange>,
    completed: usize,
    subscribers: Subscribers<usize>,
}

impl StatisticsModel {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        let (sender, changes) = mpsc::channel();
        records.subscribe(sender);
        let mut model = Self {
            records,
            changes,
            completed: 0,
            subscribers: Subscribers::new(),
        };
        if let Err(error) = model.reload() {
            tracing::warn!(error = %error, "failed to load completion records");
        }
        model
    }

    /// Count of all completion records, across trackers and dates.
    pub fn completed_trackers_count(&self) -> usize {
        self.completed
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&usize) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(&self.completed, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Drain record notifications and recount if anything changed.
    /// Returns true when the count was reloaded.
    pub fn refresh(&mut self) -> bool {
        if self.changes.try_iter().count() == 0 {
            return false;
        }
        match self.reload() {
            Ok(()) => {
                self.subscribers.publish(&self.completed);
                true
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "failed to reload statistics, keeping previous count"
                );
                false
            }
        }
    }

    fn reload(&mut self) -> StoreResult<()> {
        let records = self.records.fetch_all()?;
        self.completed = completion::total_completed(&records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CompletionRecord, Schedule, Tracker, TrackerColor};
    use crate::store::{MemoryStore, TrackerStore};
    use chrono::{Local, TimeZone};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_counts_all_records() {
        let store = MemoryStore::new();
        let tracker = Tracker::new(
            "Read",
            TrackerColor::from_rgba(9, 9, 9, 255),
            "📚",
            Schedule::every_day(),
        );
        store.tracker_store().add(&tracker).unwrap();

        let mut model = StatisticsModel::new(Arc::new(store.record_store()));
        assert_eq!(model.completed_trackers_count(), 0);
        assert!(!model.refresh());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        model.subscribe(move |count| sink.borrow_mut().push(*count));

        for day in [1, 2] {
            let date = Local.with_ymd_and_hms(2025, 3, day, 8, 0, 0).unwrap();
            store
                .record_store()
                .add(&CompletionRecord::new(tracker.id, date))
                .unwrap();
        }

        assert!(model.refresh());
        assert_eq!(model.completed_trackers_count(), 2);
        assert_eq!(*seen.borrow(), vec![0, 2]);
    }

    #[test]
    fn test_deleting_tracker_lowers_count() {
        let store = MemoryStore::new();
        let tracker = Tracker::new(
            "Walk",
            TrackerColor::from_rgba(1, 1, 1, 255),
            "🚶",
            Schedule::every_day(),
        );
        store.tracker_store().add(&tracker).unwrap();
        let date = Local.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        store
            .record_store()
            .add(&CompletionRecord::new(tracker.id, date))
            .unwrap();

        let mut model = StatisticsModel::new(Arc::new(store.record_store()));
        assert_eq!(model.completed_trackers_count(), 1);

        store.tracker_store().delete(&tracker).unwrap();
        assert!(model.refresh());
        assert_eq!(model.completed_trackers_count(), 0);
    }
}
