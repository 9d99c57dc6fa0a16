//! Composition root.
//!
//! Wires one datastore, a clock and the configuration into the models a
//! frontend needs. Nothing here is global: a frontend owns its `AppContext`.

use crate::calendar::Clock;
use crate::categories::CategoriesModel;
use crate::config::TrackerConfig;
use crate::engine::{Stores, TrackerEngine};
use crate::statistics::StatisticsModel;
use crate::store::MemoryStore;
use std::sync::Arc;

/// First screen shown at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialScreen {
    Onboarding,
    Main,
}

pub struct AppContext {
    store: MemoryStore,
    stores: Stores,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

impl AppContext {
    pub fn new(store: MemoryStore, clock: Arc<dyn Clock>, config: TrackerConfig) -> Self {
        let stores = Stores::memory(&store);
        Self {
            store,
            stores,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// A fresh engine for the main screen, selected on today's date.
    pub fn trackers_engine(&self) -> TrackerEngine {
        TrackerEngine::new(self.stores.clone(), self.clock.clone(), &self.config)
    }

    pub fn statistics(&self) -> StatisticsModel {
        StatisticsModel::new(self.stores.records.clone())
    }

    pub fn categories(&self) -> CategoriesModel {
        CategoriesModel::new(self.stores.categories.clone())
    }

    pub fn initial_screen(&self) -> InitialScreen {
        if self.config.has_seen_onboarding {
            InitialScreen::Main
        } else {
            InitialScreen::Onboarding
        }
    }

    /// Mark onboarding as seen. Persisting the config is up to the caller.
    pub fn complete_onboarding(&mut self) {
        if !self.config.has_seen_onboarding {
            tracing::debug!("onboarding completed");
        }
        self.config.has_seen_onboarding = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;
    use crate::entities::{Schedule, Tracker, TrackerColor};
    use chrono::{Local, TimeZone};

    fn context(config: TrackerConfig) -> AppContext {
        let now = Local.with_ymd_and_hms(2025, 6, 9, 10, 0, 0).unwrap();
        AppContext::new(MemoryStore::new(), Arc::new(FixedClock(now)), config)
    }

    #[test]
    fn test_onboarding_flow() {
        let mut app = context(TrackerConfig::default());
        assert_eq!(app.initial_screen(), InitialScreen::Onboarding);

        app.complete_onboarding();
        assert_eq!(app.initial_screen(), InitialScreen::Main);
        assert!(app.config().has_seen_onboarding);
    }

    #[test]
    fn test_models_share_one_datastore() {
        let app = context(TrackerConfig {
            has_seen_onboarding: true,
            ..TrackerConfig::default()
        });
        let mut engine = app.trackers_engine();
        let mut statistics = app.statistics();
        let mut categories = app.categories();

        let tracker = Tracker::new(
            "Swim",
            TrackerColor::from_rgba(0, 90, 200, 255),
            "🏊",
            Schedule::every_day(),
        );
        engine.add_tracker(tracker.clone(), "Sport").unwrap();
        engine.toggle_completion(tracker.id).unwrap();

        assert!(statistics.refresh());
        assert_eq!(statistics.completed_trackers_count(), 1);
        assert!(categories.refresh());
        assert_eq!(categories.categories()[0].title, "Sport");
    }
}
