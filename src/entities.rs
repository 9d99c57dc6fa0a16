use crate::calendar::same_calendar_day;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a tracker, immutable for the tracker's lifetime.
pub type TrackerId = Uuid;

/// One of the seven calendar weekdays, ordered Monday first (ISO 8601).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekDay {
    pub const ALL: [WeekDay; 7] = [
        WeekDay::Monday,
        WeekDay::Tuesday,
        WeekDay::Wednesday,
        WeekDay::Thursday,
        WeekDay::Friday,
        WeekDay::Saturday,
        WeekDay::Sunday,
    ];

    /// Map an ISO weekday number (Monday = 1 .. Sunday = 7) to a `WeekDay`.
    ///
    /// Returns `None` for anything outside `1..=7`.
    pub fn from_iso_number(number: u32) -> Option<Self> {
        match number {
            1..=7 => Some(Self::ALL[(number - 1) as usize]),
            _ => None,
        }
    }

    /// ISO weekday number, Monday = 1 .. Sunday = 7.
    pub fn iso_number(self) -> u32 {
        self as u32 + 1
    }

    pub fn short_name(self) -> &'static str {
        match self {
            WeekDay::Monday => "Mon",
            WeekDay::Tuesday => "Tue",
            WeekDay::Wednesday => "Wed",
            WeekDay::Thursday => "Thu",
            WeekDay::Friday => "Fri",
            WeekDay::Saturday => "Sat",
            WeekDay::Sunday => "Sun",
        }
    }
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// The weekdays a tracker is active on.
///
/// An empty schedule marks the tracker as a one-off event rather than a
/// recurring habit. Serialized as a list of ISO weekday numbers; numbers
/// outside `1..=7` are dropped on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<i64>", into = "Vec<u32>")]
pub struct Schedule(BTreeSet<WeekDay>);

impl Schedule {
    /// An empty schedule (event).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn every_day() -> Self {
        WeekDay::ALL.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, day: WeekDay) -> bool {
        self.0.contains(&day)
    }

    /// True when the schedule is empty or lists `day`.
    ///
    /// Callers special-case the empty (event) schedule before relying on this.
    pub fn is_active_on(&self, day: WeekDay) -> bool {
        self.is_empty() || self.contains(day)
    }

    /// Days in Monday-first order.
    pub fn days(&self) -> impl Iterator<Item = WeekDay> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<WeekDay> for Schedule {
    fn from_iter<I: IntoIterator<Item = WeekDay>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<i64>> for Schedule {
    fn from(raw: Vec<i64>) -> Self {
        raw.into_iter()
            .filter_map(|n| u32::try_from(n).ok())
            .filter_map(WeekDay::from_iso_number)
            .collect()
    }
}

impl From<Schedule> for Vec<u32> {
    fn from(schedule: Schedule) -> Self {
        schedule.days().map(WeekDay::iso_number).collect()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len() == WeekDay::ALL.len() {
            return write!(f, "Every day");
        }
        let names: Vec<&str> = self.days().map(WeekDay::short_name).collect();
        write!(f, "{}", names.join(", "))
    }
}

/// Opaque color token in `#RRGGBBAA` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerColor(String);

impl TrackerColor {
    pub fn from_rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self(format!("#{:02X}{:02X}{:02X}{:02X}", red, green, blue, alpha))
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional, any case).
    ///
    /// Six-digit tokens are treated as fully opaque.
    pub fn parse(token: &str) -> Option<Self> {
        let hex = token.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = match hex.len() {
            6 => (u32::from_str_radix(hex, 16).ok()? << 8) | 0xFF,
            8 => u32::from_str_radix(hex, 16).ok()?,
            _ => return None,
        };
        let [red, green, blue, alpha] = value.to_be_bytes();
        Some(Self::from_rgba(red, green, blue, alpha))
    }

    /// Red, green, blue and alpha components, if the token is well formed.
    pub fn rgba(&self) -> Option<(u8, u8, u8, u8)> {
        let hex = self.0.strip_prefix('#')?;
        if hex.len() != 8 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let [red, green, blue, alpha] = u32::from_str_radix(hex, 16).ok()?.to_be_bytes();
        Some((red, green, blue, alpha))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a tracker recurs on a weekly schedule or happens once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerKind {
    Habit,
    Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: TrackerId,
    pub name: String,
    pub color: TrackerColor,
    pub emoji: String,
    pub schedule: Schedule,
}

impl Tracker {
    /// Create a tracker with a fresh time-ordered id.
    pub fn new(
        name: impl Into<String>,
        color: TrackerColor,
        emoji: impl Into<String>,
        schedule: Schedule,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            color,
            emoji: emoji.into(),
            schedule,
        }
    }

    pub fn kind(&self) -> TrackerKind {
        if self.schedule.is_empty() {
            TrackerKind::Event
        } else {
            TrackerKind::Habit
        }
    }

    pub fn is_event(&self) -> bool {
        self.kind() == TrackerKind::Event
    }

    /// A tracker needs a non-blank name to be stored.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// A titled group of trackers. The title is unique and acts as the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerCategory {
    pub title: String,
    pub trackers: Vec<Tracker>,
}

impl TrackerCategory {
    pub fn new(title: impl Into<String>, trackers: Vec<Tracker>) -> Self {
        Self {
            title: title.into(),
            trackers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn contains(&self, tracker_id: TrackerId) -> bool {
        self.trackers.iter().any(|t| t.id == tracker_id)
    }
}

/// Evidence that a tracker was marked done on a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub tracker_id: TrackerId,
    pub date: DateTime<Local>,
}

impl CompletionRecord {
    pub fn new(tracker_id: TrackerId, date: DateTime<Local>) -> Self {
        Self { tracker_id, date }
    }

    /// Same tracker and same calendar day as `date`.
    pub fn matches(&self, tracker_id: TrackerId, date: &DateTime<Local>) -> bool {
        self.tracker_id == tracker_id && same_calendar_day(&self.date, date)
    }
}

/// Marks a tracker as pinned. Only the tracker id matters for identity;
/// `pinned_at` is metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedMarker {
    pub tracker: Tracker,
    pub pinned_at: DateTime<Local>,
}

impl PinnedMarker {
    pub fn new(tracker: Tracker, pinned_at: DateTime<Local>) -> Self {
        Self { tracker, pinned_at }
    }

    pub fn tracker_id(&self) -> TrackerId {
        self.tracker.id
    }
}
