use crate::entities::{PinnedMarker, Tracker, TrackerId};
use chrono::{DateTime, Local};

/// Outcome of flipping a tracker's pinned state.
#[derive(Debug, Clone, PartialEq)]
pub enum PinChange {
    Pin(PinnedMarker),
    /// Every marker held for the tracker, whatever its date.
    Unpin(Vec<PinnedMarker>),
}

/// Pin `tracker` if it has no marker, otherwise unpin it.
///
/// Identity is the tracker id alone; the marker date is ignored.
pub fn toggle_pin(tracker: &Tracker, date: DateTime<Local>, pinned: &[PinnedMarker]) -> PinChange {
    let existing: Vec<PinnedMarker> = pinned
        .iter()
        .filter(|m| m.tracker_id() == tracker.id)
        .cloned()
        .collect();

    if existing.is_empty() {
        PinChange::Pin(PinnedMarker::new(tracker.clone(), date))
    } else {
        PinChange::Unpin(existing)
    }
}

pub fn is_pinned(tracker_id: TrackerId, pinned: &[PinnedMarker]) -> bool {
    pinned.iter().any(|m| m.tracker_id() == tracker_id)
}
