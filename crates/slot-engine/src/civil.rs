//! Civil (wall-clock) time <-> absolute instant conversion for a named zone.
//!
//! Every conversion takes the zone explicitly. The offset is looked up for the
//! specific date being converted, so standard and daylight time are both
//! handled without ever consulting the host's local zone.
//!
//! Wall-clock times that do not map to exactly one instant are resolved as
//! follows:
//!
//! - ambiguous (fall-back overlap): the earlier instant
//! - nonexistent (spring-forward gap): the wall time is read with the offset in
//!   force before the gap, which lands just after the transition

use crate::error::{Result, SlotError};
use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::Serialize;

/// Calendar fields of an instant as seen on a wall clock in some zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CivilParts {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
}

/// Resolve an IANA zone identifier such as `"America/Chicago"`.
///
/// # Errors
/// Returns `SlotError::InvalidTimezone` when the identifier is unknown.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SlotError::InvalidTimezone(name.to_string()))
}

/// Convert a wall-clock date and time in `tz` to an absolute instant.
///
/// `hour == 24` with `minute == 0` denotes midnight at the end of the day.
///
/// # Errors
/// Returns `SlotError::InvalidCivilTime` when the date does not exist on the
/// calendar or the time of day is out of range.
pub fn civil_to_instant(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    tz: Tz,
) -> Result<DateTime<Utc>> {
    let invalid = || {
        SlotError::InvalidCivilTime(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}",
            year, month, day, hour, minute
        ))
    };

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    let naive = match (hour, minute) {
        (24, 0) => date.succ_opt().ok_or_else(invalid)?.and_time(NaiveTime::MIN),
        _ => date.and_hms_opt(hour, minute, 0).ok_or_else(invalid)?,
    };

    Ok(local_to_instant(&naive, tz))
}

/// Convert minutes-past-midnight on a civil date to an instant.
///
/// `minutes` may be 1440 (end of day). Larger values roll into the next day.
pub fn civil_minutes_to_instant(date: NaiveDate, minutes: u32, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN) + Duration::minutes(minutes as i64);
    local_to_instant(&naive, tz)
}

/// Resolve a naive wall-clock datetime in `tz` to an instant.
pub fn local_to_instant(naive: &NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // A day earlier the zone is on the pre-transition offset.
            let before = *naive - Duration::days(1);
            let offset = tz
                .offset_from_local_datetime(&before)
                .earliest()
                .map(|o| o.fix())
                .unwrap_or_else(|| tz.offset_from_utc_datetime(naive).fix());
            (*naive - Duration::seconds(offset.local_minus_utc() as i64)).and_utc()
        }
    }
}

/// Project an instant onto the wall clock of `tz`.
pub fn instant_to_civil_parts(instant: DateTime<Utc>, tz: Tz) -> CivilParts {
    let local = instant.with_timezone(&tz);
    CivilParts {
        date: local.date_naive(),
        year: local.year(),
        month: local.month(),
        day: local.day(),
        weekday: local.weekday(),
        hour: local.hour(),
        minute: local.minute(),
    }
}

/// Day of week of a civil date in `tz`, evaluated at local noon.
///
/// Noon is never inside a DST transition, so the round trip through an
/// instant cannot slip onto the neighbouring day.
pub fn weekday_at_noon(date: NaiveDate, tz: Tz) -> Weekday {
    let noon = civil_minutes_to_instant(date, 12 * 60, tz);
    instant_to_civil_parts(noon, tz).weekday
}
