//! Occupied and blackout intervals, and half-open overlap detection.
//!
//! Two intervals overlap when `a.start < b.end && b.start < a.end`. Intervals
//! that only touch (one ends exactly when the other starts) do NOT overlap.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A half-open span of absolute time `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Length of the shared span in minutes, 0 when disjoint.
    pub fn overlap_minutes(&self, other: &Interval) -> i64 {
        if !self.overlaps(other) {
            return 0;
        }
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end - start).num_minutes()
    }
}

/// Appointment lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Confirmed,
    Rescheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The statuses whose appointments still occupy their time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockingStatuses(BTreeSet<AppointmentStatus>);

impl BlockingStatuses {
    pub fn new(statuses: impl IntoIterator<Item = AppointmentStatus>) -> Self {
        Self(statuses.into_iter().collect())
    }

    pub fn blocks(&self, status: AppointmentStatus) -> bool {
        self.0.contains(&status)
    }
}

impl Default for BlockingStatuses {
    fn default() -> Self {
        Self::new([
            AppointmentStatus::Pending,
            AppointmentStatus::Scheduled,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Rescheduled,
        ])
    }
}

/// A booked appointment as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupiedInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
}

impl OccupiedInterval {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Time an administrator excluded from booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackoutInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BlackoutInterval {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Keep only the appointments whose status blocks booking.
pub fn blocking_intervals(
    occupied: &[OccupiedInterval],
    statuses: &BlockingStatuses,
) -> Vec<Interval> {
    occupied
        .iter()
        .filter(|o| statuses.blocks(o.status))
        .map(OccupiedInterval::interval)
        .collect()
}

pub fn blackout_intervals(blackouts: &[BlackoutInterval]) -> Vec<Interval> {
    blackouts.iter().map(BlackoutInterval::interval).collect()
}

/// An existing interval overlapping a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub existing: Interval,
    pub overlap_minutes: i64,
}

/// Find every interval in `existing` that overlaps `candidate`.
///
/// Results keep the order of `existing`.
pub fn find_conflicts(candidate: &Interval, existing: &[Interval]) -> Vec<Conflict> {
    existing
        .iter()
        .filter(|e| candidate.overlaps(e))
        .map(|e| Conflict {
            existing: *e,
            overlap_minutes: candidate.overlap_minutes(e),
        })
        .collect()
}

/// True when `candidate` overlaps any interval in `existing`.
pub fn overlaps_any(candidate: &Interval, existing: &[Interval]) -> bool {
    existing.iter().any(|e| candidate.overlaps(e))
}
