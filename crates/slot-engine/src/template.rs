//! Weekly availability template.
//!
//! The template is the administrator-maintained configuration the resolver
//! reads: a zone, slot sizing, lead time, booking horizon, and the civil hours
//! offered on each day of the week.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::civil::parse_timezone;
use crate::error::{Result, SlotError};

/// Minutes past local midnight, `0..=1440`.
///
/// 1440 is only meaningful as the end of a range (`"24:00"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(24 * 60);

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        match (hour, minute) {
            (24, 0) => Some(Self::END_OF_DAY),
            (0..=23, 0..=59) => Some(TimeOfDay(hour * 60 + minute)),
            _ => None,
        }
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn hour(self) -> u32 {
        self.0 / 60
    }

    pub fn minute(self) -> u32 {
        self.0 % 60
    }
}

impl FromStr for TimeOfDay {
    type Err = SlotError;

    /// Accepts `H:MM`, `HH:MM` and `HH:MM:SS` (seconds are ignored).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SlotError::InvalidTemplate(format!("invalid time of day '{}'", s));

        let mut parts = s.trim().split(':');
        let hour: u32 = parts
            .next()
            .and_then(|h| h.parse().ok())
            .ok_or_else(invalid)?;
        let minute: u32 = parts
            .next()
            .filter(|m| m.len() == 2)
            .and_then(|m| m.parse().ok())
            .ok_or_else(invalid)?;
        if let Some(seconds) = parts.next() {
            if seconds.parse::<u32>().map_or(true, |s| s > 59) {
                return Err(invalid());
            }
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Half-open civil range `[start, end)`, serialized as `["09:00", "17:00"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[TimeOfDay; 2]", into = "[TimeOfDay; 2]")]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Build a range from two `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }
}

impl From<[TimeOfDay; 2]> for TimeRange {
    fn from([start, end]: [TimeOfDay; 2]) -> Self {
        Self { start, end }
    }
}

impl From<TimeRange> for [TimeOfDay; 2] {
    fn from(range: TimeRange) -> Self {
        [range.start, range.end]
    }
}

/// Civil hours offered on each day of the week.
///
/// Ranges within a day need not be sorted or disjoint; overlapping ranges
/// produce overlapping slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyHours {
    pub sun: Vec<TimeRange>,
    pub mon: Vec<TimeRange>,
    pub tue: Vec<TimeRange>,
    pub wed: Vec<TimeRange>,
    pub thu: Vec<TimeRange>,
    pub fri: Vec<TimeRange>,
    pub sat: Vec<TimeRange>,
}

/// Days in storage order, with their wire keys.
const DAY_KEYS: [(Weekday, &str); 7] = [
    (Weekday::Sun, "sun"),
    (Weekday::Mon, "mon"),
    (Weekday::Tue, "tue"),
    (Weekday::Wed, "wed"),
    (Weekday::Thu, "thu"),
    (Weekday::Fri, "fri"),
    (Weekday::Sat, "sat"),
];

impl WeeklyHours {
    pub fn for_weekday(&self, weekday: Weekday) -> &[TimeRange] {
        match weekday {
            Weekday::Sun => &self.sun,
            Weekday::Mon => &self.mon,
            Weekday::Tue => &self.tue,
            Weekday::Wed => &self.wed,
            Weekday::Thu => &self.thu,
            Weekday::Fri => &self.fri,
            Weekday::Sat => &self.sat,
        }
    }

    pub fn for_weekday_mut(&mut self, weekday: Weekday) -> &mut Vec<TimeRange> {
        match weekday {
            Weekday::Sun => &mut self.sun,
            Weekday::Mon => &mut self.mon,
            Weekday::Tue => &mut self.tue,
            Weekday::Wed => &mut self.wed,
            Weekday::Thu => &mut self.thu,
            Weekday::Fri => &mut self.fri,
            Weekday::Sat => &mut self.sat,
        }
    }

    /// Builder-style helper: replace the ranges of one day.
    pub fn with_day(mut self, weekday: Weekday, ranges: Vec<TimeRange>) -> Self {
        *self.for_weekday_mut(weekday) = ranges;
        self
    }

    pub fn is_empty(&self) -> bool {
        DAY_KEYS
            .iter()
            .all(|(day, _)| self.for_weekday(*day).is_empty())
    }

    /// Wire key (`"sun"` .. `"sat"`) for a weekday.
    pub fn key(weekday: Weekday) -> &'static str {
        DAY_KEYS
            .iter()
            .find(|(day, _)| *day == weekday)
            .map(|(_, key)| *key)
            .unwrap_or("sun")
    }

    /// Days in storage order (Sunday first).
    pub fn days() -> impl Iterator<Item = Weekday> {
        DAY_KEYS.iter().map(|(day, _)| *day)
    }

    /// Parse weekly hours stored as serialized JSON text.
    ///
    /// Never fails: unparseable text yields no availability at all.
    pub fn parse_lenient(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!(error = %e, "weekly hours are not valid JSON; treating as no availability");
                Self::default()
            }
        }
    }

    /// Read weekly hours from a JSON value, degrading per day.
    ///
    /// A string value is treated as serialized text. A day whose entry is
    /// missing or malformed has no availability; the other days are kept.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::parse_lenient(text),
            Value::Null => Self::default(),
            Value::Object(map) => {
                let mut weekly = Self::default();
                for (day, key) in DAY_KEYS {
                    let Some(raw) = map.get(key) else {
                        continue;
                    };
                    match Vec::<TimeRange>::deserialize(raw) {
                        Ok(ranges) => *weekly.for_weekday_mut(day) = ranges,
                        Err(e) => {
                            warn!(day = key, error = %e, "malformed weekly hours; day has no availability");
                        }
                    }
                }
                weekly
            }
            other => {
                warn!(kind = value_kind(other), "weekly hours must be an object; treating as no availability");
                Self::default()
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'de> Deserialize<'de> for WeeklyHours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Recurring weekly availability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityTemplate {
    /// IANA zone in which `weekly` and slot boundaries are interpreted.
    pub timezone: String,
    /// Length of one bookable slot.
    pub slot_minutes: u32,
    /// Idle time required after each slot.
    #[serde(default)]
    pub buffer_minutes: u32,
    /// Earliest offerable start, measured from now.
    #[serde(default)]
    pub min_lead_hours: u32,
    /// How far ahead slots are offered.
    pub booking_window_days: u32,
    #[serde(default)]
    pub weekly: WeeklyHours,
}

/// Longest slot or buffer a template may ask for: one civil day.
pub const MAX_SLOT_MINUTES: u32 = 24 * 60;

/// Longest lead time a template may require, in hours (about ten years).
pub const MAX_LEAD_HOURS: u32 = 24 * 3660;

/// Furthest ahead a template may offer slots, in days (about ten years).
pub const MAX_BOOKING_WINDOW_DAYS: u32 = 3660;

impl AvailabilityTemplate {
    /// Check the numeric settings and resolve the zone.
    ///
    /// # Errors
    /// `SlotError::InvalidTemplate` for a zero slot length or booking window,
    /// or any setting above its `MAX_*` bound;
    /// `SlotError::InvalidTimezone` for an unknown zone.
    pub fn validate(&self) -> Result<Tz> {
        if self.slot_minutes == 0 {
            return Err(SlotError::InvalidTemplate(
                "slot_minutes must be greater than zero".to_string(),
            ));
        }
        if self.booking_window_days == 0 {
            return Err(SlotError::InvalidTemplate(
                "booking_window_days must be greater than zero".to_string(),
            ));
        }
        check_at_most("slot_minutes", self.slot_minutes, MAX_SLOT_MINUTES)?;
        check_at_most("buffer_minutes", self.buffer_minutes, MAX_SLOT_MINUTES)?;
        check_at_most("min_lead_hours", self.min_lead_hours, MAX_LEAD_HOURS)?;
        check_at_most(
            "booking_window_days",
            self.booking_window_days,
            MAX_BOOKING_WINDOW_DAYS,
        )?;
        parse_timezone(&self.timezone)
    }
}

fn check_at_most(field: &str, value: u32, max: u32) -> Result<()> {
    if value > max {
        return Err(SlotError::InvalidTemplate(format!(
            "{} must be at most {}, got {}",
            field, max, value
        )));
    }
    Ok(())
}
