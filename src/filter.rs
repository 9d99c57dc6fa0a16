use serde::{Deserialize, Serialize};
use std::fmt;

/// Which trackers the main list shows on top of schedule and search rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerFilter {
    #[default]
    All,
    /// Same as `All`, but selecting it moves the selected date to today.
    Today,
    Completed,
    NotCompleted,
}

impl TrackerFilter {
    /// Whether a tracker passes this filter given its completion state on
    /// the selected day.
    pub fn admits(self, completed_on_selected_day: bool) -> bool {
        match self {
            TrackerFilter::All | TrackerFilter::Today => true,
            TrackerFilter::Completed => completed_on_selected_day,
            TrackerFilter::NotCompleted => !completed_on_selected_day,
        }
    }

    /// Selecting this filter resets the selected date to the current day.
    pub fn forces_today(self) -> bool {
        self == TrackerFilter::Today
    }
}

impl fmt::Display for TrackerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrackerFilter::All => "all",
            TrackerFilter::Today => "today",
            TrackerFilter::Completed => "completed",
            TrackerFilter::NotCompleted => "not_completed",
        };
        write!(f, "{}", label)
    }
}

/// Whether the user narrowed the list. Frontends use this to choose between
/// the "nothing found" and the "nothing to track" empty states.
pub fn is_filter_applied(search_text: &str, filter: TrackerFilter) -> bool {
    !search_text.is_empty() || filter != TrackerFilter::All
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits() {
        assert!(TrackerFilter::All.admits(false));
        assert!(TrackerFilter::Today.admits(true));
        assert!(TrackerFilter::Completed.admits(true));
        assert!(!TrackerFilter::Completed.admits(false));
        assert!(TrackerFilter::NotCompleted.admits(false));
        assert!(!TrackerFilter::NotCompleted.admits(true));
    }

    #[test]
    fn test_is_filter_applied() {
        assert!(!is_filter_applied("", TrackerFilter::All));
        assert!(is_filter_applied("run", TrackerFilter::All));
        assert!(is_filter_applied("", TrackerFilter::Today));
        assert!(is_filter_applied("", TrackerFilter::NotCompleted));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TrackerFilter::NotCompleted).unwrap();
        assert_eq!(json, "\"not_completed\"");
        let parsed: TrackerFilter = serde_json::from_str("\"today\"").unwrap();
        assert_eq!(parsed, TrackerFilter::Today);
    }
}
