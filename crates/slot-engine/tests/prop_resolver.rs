//! Property-based tests for slot resolution using proptest.
//!
//! These check invariants that must hold for *any* template, snapshot and
//! current instant, not just the hand-picked cases in `resolver_tests.rs`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use slot_engine::civil::{civil_minutes_to_instant, instant_to_civil_parts, parse_timezone};
use slot_engine::resolver::{resolve_slots, MAX_SLOTS};
use slot_engine::{AvailabilityTemplate, Interval, TimeOfDay, TimeRange, WeeklyHours};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_timezone() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("UTC".to_string()),
        Just("America/Chicago".to_string()),
        Just("America/New_York".to_string()),
        Just("Europe/London".to_string()),
        Just("Australia/Sydney".to_string()),
        Just("Asia/Kolkata".to_string()),
    ]
}

fn time_of_day(minutes: u32) -> TimeOfDay {
    TimeOfDay::new(minutes / 60, minutes % 60).expect("minutes within a day")
}

/// A range on a 15-minute grid, between 15 minutes and 12 hours long.
fn arb_range() -> impl Strategy<Value = TimeRange> {
    (0u32..96, 1u32..48).prop_map(|(start_q, len_q)| {
        let start = start_q * 15;
        let end = (start + len_q * 15).min(24 * 60);
        TimeRange::new(time_of_day(start), time_of_day(end))
    })
}

fn arb_day() -> impl Strategy<Value = Vec<TimeRange>> {
    prop::collection::vec(arb_range(), 0..3)
}

fn arb_weekly() -> impl Strategy<Value = WeeklyHours> {
    (
        arb_day(),
        arb_day(),
        arb_day(),
        arb_day(),
        arb_day(),
        arb_day(),
        arb_day(),
    )
        .prop_map(|(sun, mon, tue, wed, thu, fri, sat)| WeeklyHours {
            sun,
            mon,
            tue,
            wed,
            thu,
            fri,
            sat,
        })
}

fn arb_template() -> impl Strategy<Value = AvailabilityTemplate> {
    (
        arb_timezone(),
        5u32..=120,
        0u32..=60,
        0u32..=72,
        1u32..=30,
        arb_weekly(),
    )
        .prop_map(
            |(timezone, slot_minutes, buffer_minutes, min_lead_hours, booking_window_days, weekly)| {
                AvailabilityTemplate {
                    timezone,
                    slot_minutes,
                    buffer_minutes,
                    min_lead_hours,
                    booking_window_days,
                    weekly,
                }
            },
        )
}

/// Any minute of 2026, so DST transitions on both hemispheres are covered.
fn arb_now() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..365 * 24 * 60).prop_map(|m| {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(m)
    })
}

/// Intervals relative to `now`, expressed as (offset, length) in minutes.
fn arb_offsets() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..30 * 24 * 60, 15i64..240), 0..12)
}

fn intervals(now: DateTime<Utc>, offsets: &[(i64, i64)]) -> Vec<Interval> {
    offsets
        .iter()
        .map(|(offset, len)| {
            let start = now + Duration::minutes(*offset);
            Interval::new(start, start + Duration::minutes(*len))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn overlap_is_half_open_and_symmetric(
        a0 in -1000i64..1000, a_len in 1i64..500,
        b0 in -1000i64..1000, b_len in 1i64..500,
    ) {
        let base = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let a = Interval::new(base + Duration::minutes(a0), base + Duration::minutes(a0 + a_len));
        let b = Interval::new(base + Duration::minutes(b0), base + Duration::minutes(b0 + b_len));

        prop_assert_eq!(a.overlaps(&b), a.start < b.end && b.start < a.end);
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        if a.end == b.start {
            prop_assert!(!a.overlaps(&b));
        }
    }

    #[test]
    fn slots_respect_lead_time_and_window(template in arb_template(), now in arb_now()) {
        let slots = resolve_slots(&template, &[], &[], now).unwrap();
        let earliest = now + Duration::hours(template.min_lead_hours as i64);
        let latest = now + Duration::days(template.booking_window_days as i64);

        for slot in &slots {
            prop_assert!(slot.start >= earliest, "{} before lead time {}", slot.start, earliest);
            prop_assert!(slot.start <= latest, "{} after window end {}", slot.start, latest);
        }
    }

    #[test]
    fn slots_have_exact_length_and_buffer(template in arb_template(), now in arb_now()) {
        let slots = resolve_slots(&template, &[], &[], now).unwrap();
        let length = Duration::minutes(template.slot_minutes as i64);
        let buffer = Duration::minutes(template.buffer_minutes as i64);

        for slot in &slots {
            prop_assert_eq!(slot.end - slot.start, length);
            prop_assert_eq!(slot.effective_end - slot.end, buffer);
        }
    }

    #[test]
    fn buffered_slot_stays_inside_a_civil_range(template in arb_template(), now in arb_now()) {
        let tz = parse_timezone(&template.timezone).unwrap();
        let slots = resolve_slots(&template, &[], &[], now).unwrap();

        for slot in &slots {
            let parts = instant_to_civil_parts(slot.start, tz);
            let date = parts.date;
            let contained = template.weekly.for_weekday(parts.weekday).iter().any(|r| {
                civil_minutes_to_instant(date, r.start.minutes(), tz) <= slot.start
                    && slot.effective_end <= civil_minutes_to_instant(date, r.end.minutes(), tz)
            });
            prop_assert!(contained, "slot {} not inside any range of {}", slot.label_local, date);
        }
    }

    #[test]
    fn output_is_capped_and_chronological(template in arb_template(), now in arb_now()) {
        let slots = resolve_slots(&template, &[], &[], now).unwrap();

        prop_assert!(slots.len() <= MAX_SLOTS);
        prop_assert!(slots.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[test]
    fn flags_match_brute_force_overlap(
        template in arb_template(),
        now in arb_now(),
        booked in arb_offsets(),
        blacked in arb_offsets(),
    ) {
        let occupied = intervals(now, &booked);
        let blackouts = intervals(now, &blacked);
        let slots = resolve_slots(&template, &occupied, &blackouts, now).unwrap();

        for slot in &slots {
            let span = slot.effective_span();
            prop_assert_eq!(slot.is_taken, occupied.iter().any(|o| span.overlaps(o)));
            prop_assert_eq!(slot.is_blocked, blackouts.iter().any(|b| span.overlaps(b)));
        }
    }

    #[test]
    fn resolution_is_deterministic(
        template in arb_template(),
        now in arb_now(),
        booked in arb_offsets(),
    ) {
        let occupied = intervals(now, &booked);
        let first = resolve_slots(&template, &occupied, &[], now).unwrap();
        let second = resolve_slots(&template, &occupied, &[], now).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn widening_the_window_only_appends(template in arb_template(), now in arb_now()) {
        let narrow = resolve_slots(&template, &[], &[], now).unwrap();
        let wider = AvailabilityTemplate {
            booking_window_days: template.booking_window_days + 1,
            ..template
        };
        let wide = resolve_slots(&wider, &[], &[], now).unwrap();

        prop_assert!(wide.len() >= narrow.len());
        prop_assert_eq!(&wide[..narrow.len()], &narrow[..]);
    }
}
