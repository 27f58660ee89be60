use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use slot_engine::resolver::resolve_slots;
use slot_engine::{AvailabilityTemplate, Interval, TimeRange, WeeklyHours};

fn all_week(ranges: Vec<TimeRange>) -> WeeklyHours {
    WeeklyHours::days().fold(WeeklyHours::default(), |weekly, day| {
        weekly.with_day(day, ranges.clone())
    })
}

fn bench_resolve(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap();

    // One-minute slots around the clock for 90 days: the cap does the work.
    let pathological = AvailabilityTemplate {
        timezone: "America/Chicago".to_string(),
        slot_minutes: 1,
        buffer_minutes: 0,
        min_lead_hours: 0,
        booking_window_days: 90,
        weekly: all_week(vec![TimeRange::parse("00:00", "24:00").unwrap()]),
    };

    // A typical shop: two daily ranges, 30-minute slots with a buffer, two weeks.
    let typical = AvailabilityTemplate {
        timezone: "America/Chicago".to_string(),
        slot_minutes: 30,
        buffer_minutes: 10,
        min_lead_hours: 4,
        booking_window_days: 14,
        weekly: all_week(vec![
            TimeRange::parse("08:00", "12:00").unwrap(),
            TimeRange::parse("13:00", "17:00").unwrap(),
        ]),
    };
    let occupied: Vec<Interval> = (0..200)
        .map(|i| {
            let start = now + Duration::minutes(i * 95);
            Interval::new(start, start + Duration::minutes(30))
        })
        .collect();

    c.bench_function("resolve_pathological_1min_90d", |b| {
        b.iter(|| resolve_slots(black_box(&pathological), &[], &[], black_box(now)))
    });

    c.bench_function("resolve_typical_with_200_bookings", |b| {
        b.iter(|| resolve_slots(black_box(&typical), black_box(&occupied), &[], black_box(now)))
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
