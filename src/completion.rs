//! Completion toggle and the read-side queries over completion records.

use crate::entities::{CompletionRecord, TrackerId};
use chrono::{DateTime, Local};

/// The store mutations needed to flip a tracker's completion for one day.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionChange {
    pub remove: Vec<CompletionRecord>,
    pub add: Option<CompletionRecord>,
}

impl CompletionChange {
    /// True when applying the change marks the tracker done.
    pub fn marks_done(&self) -> bool {
        self.add.is_some()
    }
}

/// Flip the completion state of `tracker_id` on the calendar day of `date`.
///
/// If a record exists for that day it is removed, otherwise a new record is
/// added. This is a flip, not a set-to-value.
pub fn toggle_completion(
    tracker_id: TrackerId,
    date: DateTime<Local>,
    existing: &[CompletionRecord],
) -> CompletionChange {
    let remove: Vec<CompletionRecord> = existing
        .iter()
        .filter(|r| r.matches(tracker_id, &date))
        .cloned()
        .collect();

    if remove.is_empty() {
        CompletionChange {
            remove,
            add: Some(CompletionRecord::new(tracker_id, date)),
        }
    } else {
        CompletionChange { remove, add: None }
    }
}

pub fn is_completed_on(
    tracker_id: TrackerId,
    date: &DateTime<Local>,
    records: &[CompletionRecord],
) -> bool {
    records.iter().any(|r| r.matches(tracker_id, date))
}

/// Number of days `tracker_id` was marked done, across all dates.
pub fn completed_count(tracker_id: TrackerId, records: &[CompletionRecord]) -> usize {
    records.iter().filter(|r| r.tracker_id == tracker_id).count()
}

/// Global completed-trackers count shown on the statistics screen.
pub fn total_completed(records: &[CompletionRecord]) -> usize {
    records.len()
}
