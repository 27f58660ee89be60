//! WASM bindings for slot-engine.
//!
//! Exposes slot resolution and the civil/instant conversion primitives to the
//! booking page via `wasm-bindgen`. Complex values cross the boundary as JSON
//! strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p slot-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir web/pkg/ \
//!   target/wasm32-unknown-unknown/release/slot_engine_wasm.wasm
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use slot_engine::{BlockingStatuses, SlotSnapshot, TimeOfDay};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CivilDto {
    date: String,
    time: String,
    weekday: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (with offset) and naive `YYYY-MM-DDTHH:MM:SS`, which is
/// read as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

fn resolve_json(input_json: &str, now: &str, default_timezone: Option<&str>) -> Result<String, String> {
    let snapshot: SlotSnapshot = serde_json::from_str(input_json)
        .map_err(|e| format!("Invalid slot input JSON: {}", e))?;
    let now = parse_datetime(now)?;

    let slots = snapshot
        .resolve(default_timezone, &BlockingStatuses::default(), now)
        .map_err(|e| e.to_string())?;

    serde_json::to_string(&slots).map_err(|e| format!("Serialization error: {}", e))
}

fn civil_to_instant_str(date: &str, time: &str, timezone: &str) -> Result<String, String> {
    let tz = slot_engine::parse_timezone(timezone).map_err(|e| e.to_string())?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {}", date, e))?;
    let time: TimeOfDay = time.parse().map_err(|e: slot_engine::SlotError| e.to_string())?;

    let instant = slot_engine::civil::civil_minutes_to_instant(date, time.minutes(), tz);
    Ok(instant.to_rfc3339())
}

fn instant_to_civil_json(instant: &str, timezone: &str) -> Result<String, String> {
    let tz = slot_engine::parse_timezone(timezone).map_err(|e| e.to_string())?;
    let instant = parse_datetime(instant)?;
    let parts = slot_engine::instant_to_civil_parts(instant, tz);

    let dto = CivilDto {
        date: parts.date.format("%Y-%m-%d").to_string(),
        time: format!("{:02}:{:02}", parts.hour, parts.minute),
        weekday: parts.weekday.to_string(),
    };
    serde_json::to_string(&dto).map_err(|e| format!("Serialization error: {}", e))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Resolve the bookable slots for a snapshot.
///
/// `input_json` is `{ template, appointments, blackouts }`; `now` is an ISO
/// 8601 instant. `default_timezone` applies only when the template record has
/// no zone. Returns a JSON array of slots.
#[wasm_bindgen(js_name = "computeSlots")]
pub fn compute_slots(
    input_json: &str,
    now: &str,
    default_timezone: Option<String>,
) -> Result<String, JsValue> {
    resolve_json(input_json, now, default_timezone.as_deref()).map_err(|e| JsValue::from_str(&e))
}

/// Convert a wall-clock `YYYY-MM-DD` + `HH:MM` in `timezone` to an RFC 3339
/// UTC instant.
#[wasm_bindgen(js_name = "civilToInstant")]
pub fn civil_to_instant(date: &str, time: &str, timezone: &str) -> Result<String, JsValue> {
    civil_to_instant_str(date, time, timezone).map_err(|e| JsValue::from_str(&e))
}

/// Project an instant onto the wall clock of `timezone`.
///
/// Returns `{ date, time, weekday }` as JSON.
#[wasm_bindgen(js_name = "instantToCivil")]
pub fn instant_to_civil(instant: &str, timezone: &str) -> Result<String, JsValue> {
    instant_to_civil_json(instant, timezone).map_err(|e| JsValue::from_str(&e))
}
