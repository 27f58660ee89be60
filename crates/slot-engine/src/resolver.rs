//! Bookable slot generation.
//!
//! Walks civil days in the template's zone, cuts each day's ranges into
//! slot-sized steps, and flags every admitted slot that collides with a
//! booking or a blackout. Flagged slots are still emitted so callers can grey
//! them out instead of hiding them.
//!
//! The computation is pure: the same template, snapshots and `now` always
//! produce the same list.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::civil::{civil_minutes_to_instant, instant_to_civil_parts, weekday_at_noon};
use crate::error::{Result, SlotError};
use crate::interval::{
    blackout_intervals, blocking_intervals, overlaps_any, BlackoutInterval, BlockingStatuses,
    Interval, OccupiedInterval,
};
use crate::template::AvailabilityTemplate;

/// Upper bound on the number of slots returned by one resolution.
pub const MAX_SLOTS: usize = 120;

const START_LABEL_FORMAT: &str = "%a, %b %-d, %-I:%M %p";
const END_LABEL_FORMAT: &str = "%-I:%M %p";

/// A candidate appointment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `end` plus the template buffer; the span checked for conflicts.
    pub effective_end: DateTime<Utc>,
    /// Start rendered in the template zone. Presentation only.
    pub label_local: String,
    pub label_end_local: String,
    pub is_taken: bool,
    pub is_blocked: bool,
}

impl Slot {
    pub fn is_open(&self) -> bool {
        !self.is_taken && !self.is_blocked
    }

    /// `[start, effective_end)`: the span checked for conflicts.
    pub fn effective_span(&self) -> Interval {
        Interval::new(self.start, self.effective_end)
    }
}

/// Compute the bookable slots offered at `now`.
///
/// `occupied` must already be restricted to blocking appointments; see
/// [`resolve_slots_for`] to filter raw appointment records.
///
/// Slots are returned earliest first and capped at [`MAX_SLOTS`]. A slot is
/// admitted only when it starts inside `[now + min_lead_hours, now +
/// booking_window_days]` and its buffered end stays inside its civil range.
///
/// # Errors
/// Returns an error when the template fails [`AvailabilityTemplate::validate`].
pub fn resolve_slots(
    template: &AvailabilityTemplate,
    occupied: &[Interval],
    blackouts: &[Interval],
    now: DateTime<Utc>,
) -> Result<Vec<Slot>> {
    let tz = template.validate()?;
    let (window_start, window_end) = booking_window(template, now)?;
    if template.weekly.is_empty() {
        debug!(timezone = %tz, "template offers no weekly hours");
        return Ok(Vec::new());
    }

    let mut slots: Vec<Slot> = Vec::new();
    let mut day = instant_to_civil_parts(window_start, tz).date;

    while slots.len() < MAX_SLOTS {
        if civil_minutes_to_instant(day, 0, tz) > window_end {
            break;
        }

        let mut candidates = day_candidates(template, tz, day, window_start, window_end);
        // Ranges may be unsorted or overlapping; keep output chronological
        // without dropping duplicates.
        candidates.sort_by_key(|(start, _, _)| *start);

        for (start, end, effective_end) in candidates {
            if slots.len() >= MAX_SLOTS {
                break;
            }
            let mut slot = Slot {
                start,
                end,
                effective_end,
                label_local: label(start, tz, START_LABEL_FORMAT),
                label_end_local: label(end, tz, END_LABEL_FORMAT),
                is_taken: false,
                is_blocked: false,
            };
            let span = slot.effective_span();
            slot.is_taken = overlaps_any(&span, occupied);
            slot.is_blocked = overlaps_any(&span, blackouts);
            slots.push(slot);
        }

        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    debug!(
        timezone = %tz,
        emitted = slots.len(),
        capped = slots.len() >= MAX_SLOTS,
        "resolved slots"
    );

    Ok(slots)
}

/// Like [`resolve_slots`], but takes raw appointment and blackout records and
/// keeps only appointments whose status is in `statuses`.
pub fn resolve_slots_for(
    template: &AvailabilityTemplate,
    appointments: &[OccupiedInterval],
    statuses: &BlockingStatuses,
    blackouts: &[BlackoutInterval],
    now: DateTime<Utc>,
) -> Result<Vec<Slot>> {
    let occupied = blocking_intervals(appointments, statuses);
    let blackouts = blackout_intervals(blackouts);
    resolve_slots(template, &occupied, &blackouts, now)
}

/// The earliest slot that is neither taken nor blocked.
pub fn first_open_slot(
    template: &AvailabilityTemplate,
    occupied: &[Interval],
    blackouts: &[Interval],
    now: DateTime<Utc>,
) -> Result<Option<Slot>> {
    Ok(resolve_slots(template, occupied, blackouts, now)?
        .into_iter()
        .find(Slot::is_open))
}

/// True when `[start, end)` is a slot the template offers at `now`, ignoring
/// conflicts and the output cap.
pub fn is_offered(
    template: &AvailabilityTemplate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let tz = template.validate()?;
    let (window_start, window_end) = booking_window(template, now)?;
    let day = instant_to_civil_parts(start, tz).date;

    Ok(day_candidates(template, tz, day, window_start, window_end)
        .iter()
        .any(|(s, e, _)| *s == start && *e == end))
}

/// `[now + lead time, now + booking window]`.
fn booking_window(
    template: &AvailabilityTemplate,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let out_of_range = |field: &str| {
        SlotError::InvalidTemplate(format!("{} from {} is out of range", field, now))
    };
    let start = now
        .checked_add_signed(Duration::hours(template.min_lead_hours as i64))
        .ok_or_else(|| out_of_range("min_lead_hours"))?;
    let end = now
        .checked_add_signed(Duration::days(template.booking_window_days as i64))
        .ok_or_else(|| out_of_range("booking_window_days"))?;
    Ok((start, end))
}

/// Admitted `(start, end, effective_end)` triples for one civil day, in range
/// order.
fn day_candidates(
    template: &AvailabilityTemplate,
    tz: Tz,
    day: NaiveDate,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> {
    let slot_len = Duration::minutes(template.slot_minutes as i64);
    let buffer = Duration::minutes(template.buffer_minutes as i64);
    let weekday = weekday_at_noon(day, tz);

    let mut out = Vec::new();
    for range in template.weekly.for_weekday(weekday) {
        let range_start = civil_minutes_to_instant(day, range.start.minutes(), tz);
        let range_end = civil_minutes_to_instant(day, range.end.minutes(), tz);

        let mut cursor = range_start;
        while cursor + slot_len <= range_end {
            let slot_end = cursor + slot_len;
            let effective_end = slot_end + buffer;
            // A slot whose buffer spills past the range is dropped, not truncated.
            if effective_end <= range_end && cursor >= window_start && cursor <= window_end {
                out.push((cursor, slot_end, effective_end));
            }
            cursor = slot_end;
        }
    }
    out
}

fn label(instant: DateTime<Utc>, tz: Tz, format: &str) -> String {
    instant.with_timezone(&tz).format(format).to_string()
}
