//! Loading the current availability template from stored records.
//!
//! The store may hold several template rows; the most recently updated one is
//! current. This is also the only layer allowed to apply a default zone: the
//! resolver itself never guesses one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::interval::{BlackoutInterval, BlockingStatuses, OccupiedInterval};
use crate::resolver::{resolve_slots_for, Slot};
use crate::template::{AvailabilityTemplate, WeeklyHours};

fn default_slot_minutes() -> u32 {
    30
}

fn default_booking_window_days() -> u32 {
    14
}

/// A template row as handed over by the record store.
///
/// `weekly` may be structured JSON or serialized text; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    #[serde(default)]
    pub buffer_minutes: u32,
    #[serde(default)]
    pub min_lead_hours: u32,
    #[serde(default = "default_booking_window_days")]
    pub booking_window_days: u32,
    #[serde(default)]
    pub weekly: WeeklyHours,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TemplateRecord {
    /// Turn the row into a template, filling a missing or blank zone with
    /// `default_timezone`.
    ///
    /// # Errors
    /// Returns `SlotError::InvalidTimezone` when neither the row nor the
    /// default names a zone; other validation is left to the resolver.
    pub fn into_template(self, default_timezone: Option<&str>) -> Result<AvailabilityTemplate> {
        let timezone = self
            .timezone
            .filter(|tz| !tz.trim().is_empty())
            .or_else(|| default_timezone.map(str::to_string))
            .ok_or_else(|| SlotError::InvalidTimezone("no timezone configured".to_string()))?;

        Ok(AvailabilityTemplate {
            timezone,
            slot_minutes: self.slot_minutes,
            buffer_minutes: self.buffer_minutes,
            min_lead_hours: self.min_lead_hours,
            booking_window_days: self.booking_window_days,
            weekly: self.weekly,
        })
    }
}

/// Pick the most recently updated record.
///
/// Records without `updated_at` sort before any dated record; among equal
/// timestamps the later record in the slice wins.
pub fn latest_template(records: &[TemplateRecord]) -> Option<&TemplateRecord> {
    records
        .iter()
        .enumerate()
        .max_by_key(|(idx, r)| (r.updated_at, *idx))
        .map(|(_, r)| r)
}

/// Everything one resolution needs, in the shape callers exchange as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub template: TemplateRecord,
    #[serde(default)]
    pub appointments: Vec<OccupiedInterval>,
    #[serde(default)]
    pub blackouts: Vec<BlackoutInterval>,
}

impl SlotSnapshot {
    /// Load the template and resolve the slots offered at `now`.
    pub fn resolve(
        &self,
        default_timezone: Option<&str>,
        statuses: &BlockingStatuses,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>> {
        let template = self.template.clone().into_template(default_timezone)?;
        resolve_slots_for(&template, &self.appointments, statuses, &self.blackouts, now)
    }
}
