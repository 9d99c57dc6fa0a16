//! Visibility engine: derives the grouped list of trackers to display.
//!
//! Given the raw catalog of categories, the completion records, the pinned
//! markers and the user's current query (selected date, search text, filter),
//! [`compute_visible`] produces the ordered list of categories to render:
//!
//! 1. A tracker is kept when it matches the search text, is scheduled for
//!    the selected day, and passes the active filter.
//! 2. Pinned trackers are hoisted out of their category into a synthetic
//!    "Pinned" category placed first.
//! 3. Categories without any remaining tracker are dropped.
//!
//! The computation is total: it never fails and borrows its inputs.

use crate::calendar::{iso_weekday, same_calendar_day};
use crate::entities::{
    CompletionRecord, PinnedMarker, Tracker, TrackerCategory, TrackerId, WeekDay,
};
use crate::filter::TrackerFilter;
use chrono::{DateTime, Local};
use std::collections::HashSet;

/// Title of the synthetic category holding pinned trackers.
pub const PINNED_CATEGORY_TITLE: &str = "Pinned";

/// The user-controlled inputs of a visibility computation.
#[derive(Debug, Clone)]
pub struct VisibilityQuery<'a> {
    pub selected_date: DateTime<Local>,
    pub search_text: &'a str,
    pub filter: TrackerFilter,
    pub pinned_title: &'a str,
}

impl<'a> VisibilityQuery<'a> {
    pub fn new(selected_date: DateTime<Local>) -> Self {
        Self {
            selected_date,
            search_text: "",
            filter: TrackerFilter::All,
            pinned_title: PINNED_CATEGORY_TITLE,
        }
    }

    pub fn with_search(mut self, search_text: &'a str) -> Self {
        self.search_text = search_text;
        self
    }

    pub fn with_filter(mut self, filter: TrackerFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_pinned_title(mut self, pinned_title: &'a str) -> Self {
        self.pinned_title = pinned_title;
        self
    }
}

/// Ids of trackers with a completion record on the same calendar day as `date`.
pub fn completed_ids_on(
    records: &[CompletionRecord],
    date: &DateTime<Local>,
) -> HashSet<TrackerId> {
    records
        .iter()
        .filter(|r| same_calendar_day(&r.date, date))
        .map(|r| r.tracker_id)
        .collect()
}

/// Case-insensitive substring match; an empty query matches everything.
pub fn matches_search(tracker: &Tracker, search_text: &str) -> bool {
    search_text.is_empty()
        || tracker
            .name
            .to_lowercase()
            .contains(&search_text.to_lowercase())
}

/// Schedule rule for one tracker on the selected day.
///
/// Habits show on their scheduled weekdays. Events show until they are
/// completed, and afterwards only on the day they were completed.
pub fn matches_schedule(
    tracker: &Tracker,
    day: WeekDay,
    records: &[CompletionRecord],
    selected_date: &DateTime<Local>,
) -> bool {
    if !tracker.is_event() {
        return tracker.schedule.contains(day);
    }

    let mut ever_completed = false;
    for record in records.iter().filter(|r| r.tracker_id == tracker.id) {
        if record.matches(tracker.id, selected_date) {
            return true;
        }
        ever_completed = true;
    }
    !ever_completed
}

/// Compute the ordered, grouped list of trackers to display.
pub fn compute_visible(
    categories: &[TrackerCategory],
    records: &[CompletionRecord],
    pinned: &[PinnedMarker],
    query: &VisibilityQuery<'_>,
) -> Vec<TrackerCategory> {
    let day = iso_weekday(&query.selected_date);
    let completed_today = completed_ids_on(records, &query.selected_date);
    let pinned_ids: HashSet<TrackerId> = pinned.iter().map(PinnedMarker::tracker_id).collect();

    let is_visible = |tracker: &Tracker| {
        matches_search(tracker, query.search_text)
            && matches_schedule(tracker, day, records, &query.selected_date)
            && query.filter.admits(completed_today.contains(&tracker.id))
    };

    let mut hoisted = Vec::new();
    let mut hoisted_ids = HashSet::new();
    let mut visible = Vec::with_capacity(categories.len() + 1);

    for category in categories {
        let mut trackers = Vec::new();
        for tracker in category.trackers.iter().filter(|t| is_visible(t)) {
            if pinned_ids.contains(&tracker.id) {
                if hoisted_ids.insert(tracker.id) {
                    hoisted.push(tracker.clone());
                }
            } else {
                trackers.push(tracker.clone());
            }
        }
        if !trackers.is_empty() {
            visible.push(TrackerCategory::new(category.title.clone(), trackers));
        }
    }

    if !hoisted.is_empty() {
        visible.insert(0, TrackerCategory::new(query.pinned_title, hoisted));
    }

    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Schedule, TrackerColor};
    use chrono::{Duration, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn habit(name: &str, days: &[WeekDay]) -> Tracker {
        Tracker::new(
            name,
            TrackerColor::from_rgba(0x33, 0xCF, 0x69, 0xFF),
            "🙂",
            days.iter().copied().collect(),
        )
    }

    fn event(name: &str) -> Tracker {
        Tracker::new(name, TrackerColor::from_rgba(0xFD, 0x4C, 0x49, 0xFF), "📅", Schedule::new())
    }

    fn titles(categories: &[TrackerCategory]) -> Vec<&str> {
        categories.iter().map(|c| c.title.as_str()).collect()
    }

    fn names(category: &TrackerCategory) -> Vec<&str> {
        category.trackers.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_habit_visible_only_on_scheduled_days() {
        let t1 = habit("Stretch", &[WeekDay::Monday, WeekDay::Wednesday]);
        let categories = vec![TrackerCategory::new("Health", vec![t1.clone()])];

        // 2025-06-09 is a Monday
        let monday = VisibilityQuery::new(date(2025, 6, 9));
        let visible = compute_visible(&categories, &[], &[], &monday);
        assert_eq!(titles(&visible), vec!["Health"]);
        assert_eq!(visible[0].trackers[0].id, t1.id);

        let tuesday = VisibilityQuery::new(date(2025, 6, 10));
        assert!(compute_visible(&categories, &[], &[], &tuesday).is_empty());
    }

    #[test]
    fn test_habit_visibility_over_a_full_week() {
        let days = [WeekDay::Tuesday, WeekDay::Saturday];
        let categories = vec![TrackerCategory::new("Home", vec![habit("Laundry", &days)])];
        let start = date(2025, 6, 9);

        for offset in 0..14 {
            let day = start + Duration::days(offset);
            let query = VisibilityQuery::new(day);
            let shown = !compute_visible(&categories, &[], &[], &query).is_empty();
            assert_eq!(shown, days.contains(&iso_weekday(&day)), "offset {}", offset);
        }
    }

    #[test]
    fn test_uncompleted_event_visible_every_day() {
        let categories = vec![TrackerCategory::new("Errands", vec![event("Passport")])];
        let start = date(2025, 1, 1);
        for offset in 0..10 {
            let query = VisibilityQuery::new(start + Duration::days(offset * 37));
            assert_eq!(compute_visible(&categories, &[], &[], &query).len(), 1);
        }
    }

    #[test]
    fn test_completed_event_visible_only_on_completion_day() {
        let t2 = event("Dentist");
        let categories = vec![TrackerCategory::new("Errands", vec![t2.clone()])];
        let records = vec![CompletionRecord::new(t2.id, date(2025, 6, 10))];

        let same_day = VisibilityQuery::new(Local.with_ymd_and_hms(2025, 6, 10, 23, 0, 0).unwrap());
        assert_eq!(compute_visible(&categories, &records, &[], &same_day).len(), 1);

        for other in [date(2025, 6, 11), date(2025, 6, 9), date(2025, 6, 17)] {
            let query = VisibilityQuery::new(other);
            assert!(compute_visible(&categories, &records, &[], &query).is_empty());
        }
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let categories = vec![TrackerCategory::new(
            "Health",
            vec![habit("Morning Run", &WeekDay::ALL), habit("Read", &WeekDay::ALL)],
        )];
        let query = VisibilityQuery::new(date(2025, 6, 9)).with_search("RUN");
        let visible = compute_visible(&categories, &[], &[], &query);
        assert_eq!(visible.len(), 1);
        assert_eq!(names(&visible[0]), vec!["Morning Run"]);

        let none = VisibilityQuery::new(date(2025, 6, 9)).with_search("swim");
        assert!(compute_visible(&categories, &[], &[], &none).is_empty());
    }

    #[test]
    fn test_completed_and_not_completed_filters() {
        let done = habit("Water", &WeekDay::ALL);
        let open = habit("Walk", &WeekDay::ALL);
        let categories = vec![TrackerCategory::new("Health", vec![done.clone(), open.clone()])];
        let selected = date(2025, 6, 9);
        let records = vec![
            CompletionRecord::new(done.id, selected),
            // completion on another day does not count
            CompletionRecord::new(open.id, date(2025, 6, 8)),
        ];

        let completed = VisibilityQuery::new(selected).with_filter(TrackerFilter::Completed);
        let visible = compute_visible(&categories, &records, &[], &completed);
        assert_eq!(names(&visible[0]), vec!["Water"]);

        let not_completed = VisibilityQuery::new(selected).with_filter(TrackerFilter::NotCompleted);
        let visible = compute_visible(&categories, &records, &[], &not_completed);
        assert_eq!(names(&visible[0]), vec!["Walk"]);

        let today = VisibilityQuery::new(selected).with_filter(TrackerFilter::Today);
        let visible = compute_visible(&categories, &records, &[], &today);
        assert_eq!(visible[0].trackers.len(), 2);
    }

    #[test]
    fn test_pinned_trackers_are_hoisted() {
        let t1 = habit("Stretch", &WeekDay::ALL);
        let t3 = habit("Vitamins", &WeekDay::ALL);
        let t4 = habit("Budget", &WeekDay::ALL);
        let categories = vec![
            TrackerCategory::new("Finance", vec![t4.clone()]),
            TrackerCategory::new("Health", vec![t1.clone(), t3.clone()]),
        ];
        let selected = date(2025, 6, 9);
        let pinned = vec![PinnedMarker::new(t1.clone(), selected)];

        let visible = compute_visible(&categories, &[], &pinned, &VisibilityQuery::new(selected));
        assert_eq!(titles(&visible), vec![PINNED_CATEGORY_TITLE, "Finance", "Health"]);
        assert_eq!(names(&visible[0]), vec!["Stretch"]);
        assert_eq!(names(&visible[2]), vec!["Vitamins"]);

        let occurrences = visible
            .iter()
            .flat_map(|c| c.trackers.iter())
            .filter(|t| t.id == t1.id)
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn test_category_emptied_by_pinning_is_dropped() {
        let t1 = habit("Stretch", &WeekDay::ALL);
        let categories = vec![TrackerCategory::new("Health", vec![t1.clone()])];
        let selected = date(2025, 6, 9);
        let pinned = vec![PinnedMarker::new(t1, selected)];

        let visible = compute_visible(&categories, &[], &pinned, &VisibilityQuery::new(selected));
        assert_eq!(titles(&visible), vec![PINNED_CATEGORY_TITLE]);
    }

    #[test]
    fn test_pinned_category_absent_when_pinned_tracker_filtered_out() {
        let t1 = habit("Stretch", &[WeekDay::Monday]);
        let t2 = habit("Read", &WeekDay::ALL);
        let categories = vec![TrackerCategory::new("Health", vec![t1.clone(), t2])];
        let tuesday = date(2025, 6, 10);
        let pinned = vec![PinnedMarker::new(t1, tuesday)];

        let visible = compute_visible(&categories, &[], &pinned, &VisibilityQuery::new(tuesday));
        assert_eq!(titles(&visible), vec!["Health"]);
    }

    #[test]
    fn test_custom_pinned_title() {
        let t1 = habit("Stretch", &WeekDay::ALL);
        let categories = vec![TrackerCategory::new("Health", vec![t1.clone()])];
        let selected = date(2025, 6, 9);
        let pinned = vec![PinnedMarker::new(t1, selected)];
        let query = VisibilityQuery::new(selected).with_pinned_title("Закреплённые");

        let visible = compute_visible(&categories, &[], &pinned, &query);
        assert_eq!(titles(&visible), vec!["Закреплённые"]);
    }

    #[test]
    fn test_preserves_category_and_tracker_order() {
        let a = habit("A", &WeekDay::ALL);
        let b = habit("B", &WeekDay::ALL);
        let c = habit("C", &WeekDay::ALL);
        let categories = vec![
            TrackerCategory::new("Zeta", vec![c.clone(), a.clone()]),
            TrackerCategory::new("Alpha", vec![b.clone()]),
            TrackerCategory::new("Empty", vec![]),
        ];
        let monday = VisibilityQuery::new(date(2025, 6, 9));
        let visible = compute_visible(&categories, &[], &[], &monday);
        assert_eq!(titles(&visible), vec!["Zeta", "Alpha"]);
        assert_eq!(names(&visible[0]), vec!["C", "A"]);
    }
}
