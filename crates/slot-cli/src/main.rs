//! `slots` CLI: resolve, validate and book appointment slots from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Resolve slots for a snapshot (stdin → stdout)
//! cat snapshot.json | slots resolve
//!
//! # Resolve as of a fixed instant, open slots only
//! slots resolve -i snapshot.json --now 2026-03-01T12:00:00Z --open-only
//!
//! # Validate a template record and show its weekly hours
//! slots check -i template.json
//!
//! # Wall clock → instant, and back
//! slots convert --tz America/Chicago --date 2026-03-09 --time 09:00
//! slots convert --tz America/Chicago --instant 2026-03-09T14:00:00Z
//!
//! # Try to book a slot against the snapshot
//! slots book -i snapshot.json --start 2026-03-02T15:30:00Z --name Dana --email dana@example.com
//! ```
//!
//! Exit codes: 0 on success, 1 on error, 3 when a booking loses to an
//! existing one (pick another slot).

mod config;

use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use slot_engine::booking::{book_slot, BookingError, BookingRequest, MemoryStore};
use slot_engine::civil::civil_minutes_to_instant;
use slot_engine::{
    instant_to_civil_parts, parse_timezone, SlotSnapshot, TemplateRecord, TimeOfDay, WeeklyHours,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Exit code for a booking rejected because the slot is already held.
const EXIT_SLOT_UNAVAILABLE: i32 = 3;

#[derive(Parser)]
#[command(name = "slots", version, about = "Appointment slot resolver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log resolver decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve bookable slots for a snapshot
    Resolve {
        /// Snapshot JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Resolve as of this RFC 3339 instant instead of the current time
        #[arg(long)]
        now: Option<String>,
        /// Drop taken and blocked slots
        #[arg(long)]
        open_only: bool,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a template record and print its weekly hours
    Check {
        /// Template record JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Convert between wall-clock time in a zone and UTC instants
    Convert {
        /// IANA timezone, e.g. America/Chicago
        #[arg(long)]
        tz: String,
        /// Civil date (YYYY-MM-DD)
        #[arg(long, requires = "time", conflicts_with = "instant")]
        date: Option<String>,
        /// Civil time of day (HH:MM)
        #[arg(long, requires = "date")]
        time: Option<String>,
        /// RFC 3339 instant to project onto the zone's wall clock
        #[arg(long)]
        instant: Option<String>,
    },
    /// Book a slot against the appointments in a snapshot
    Book {
        /// Snapshot JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Slot start as an RFC 3339 instant
        #[arg(long)]
        start: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Book as of this RFC 3339 instant instead of the current time
        #[arg(long)]
        now: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    debug!(?config, "loaded config");

    match cli.command {
        Commands::Resolve {
            input,
            output,
            now,
            open_only,
            pretty,
        } => {
            let snapshot: SlotSnapshot = parse_json(&read_input(input.as_deref())?)?;
            let now = parse_now(now.as_deref())?;

            let mut slots = snapshot
                .resolve(
                    Some(config.default_timezone.as_str()),
                    &config.blocking_statuses,
                    now,
                )
                .context("Failed to resolve slots")?;
            if open_only {
                slots.retain(|s| s.is_open());
            }

            let json = if pretty || config.pretty {
                serde_json::to_string_pretty(&slots)?
            } else {
                serde_json::to_string(&slots)?
            };
            write_output(output.as_deref(), &json)?;
        }
        Commands::Check { input } => {
            let record: TemplateRecord = parse_json(&read_input(input.as_deref())?)?;
            let template = record
                .into_template(Some(config.default_timezone.as_str()))
                .context("Invalid template")?;
            let tz = template.validate().context("Invalid template")?;
            if template.weekly.is_empty() {
                warn!("template has no weekly hours; no slots will be offered");
            }

            println!("timezone: {}", tz);
            println!(
                "slot: {} min, buffer: {} min, lead: {} h, window: {} d",
                template.slot_minutes,
                template.buffer_minutes,
                template.min_lead_hours,
                template.booking_window_days
            );
            for day in WeeklyHours::days() {
                println!("{}: {}", WeeklyHours::key(day), describe_day(&template.weekly, day));
            }
        }
        Commands::Convert {
            tz,
            date,
            time,
            instant,
        } => {
            let zone = parse_timezone(&tz)?;
            match (date, time, instant) {
                (Some(date), Some(time), None) => {
                    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                        .with_context(|| format!("Invalid date: {}", date))?;
                    let time: TimeOfDay = time.parse()?;
                    let instant = civil_minutes_to_instant(date, time.minutes(), zone);
                    println!("{}", instant.to_rfc3339());
                }
                (None, None, Some(instant)) => {
                    let instant = parse_instant(&instant)?;
                    let parts = instant_to_civil_parts(instant, zone);
                    println!(
                        "{} {:02}:{:02} {}",
                        parts.date,
                        parts.hour,
                        parts.minute,
                        parts.weekday
                    );
                }
                _ => anyhow::bail!("Pass either --date and --time, or --instant"),
            }
        }
        Commands::Book {
            input,
            start,
            name,
            email,
            phone,
            notes,
            now,
        } => {
            let snapshot: SlotSnapshot = parse_json(&read_input(input.as_deref())?)?;
            let now = parse_now(now.as_deref())?;
            let start = parse_instant(&start)?;

            let template = snapshot
                .template
                .clone()
                .into_template(Some(config.default_timezone.as_str()))
                .context("Invalid template")?;

            let store = MemoryStore::new(config.blocking_statuses.clone());
            for appointment in snapshot.appointments {
                store.add_existing(appointment)?;
            }
            for blackout in snapshot.blackouts {
                store.add_blackout(blackout)?;
            }

            let request = BookingRequest {
                start,
                end: start
                    .checked_add_signed(Duration::minutes(template.slot_minutes as i64))
                    .context("Slot end is out of range")?,
                timezone: template.timezone.clone(),
                name,
                email,
                phone,
                notes,
            };

            match book_slot(&store, &template, &request, now) {
                Ok(appointment) => println!("{}", serde_json::to_string_pretty(&appointment)?),
                Err(BookingError::SlotUnavailable {
                    start,
                    end,
                    conflicts,
                }) => {
                    eprintln!(
                        "slot unavailable: {} - {} is already held; resolve slots again and pick another",
                        start.to_rfc3339(),
                        end.to_rfc3339()
                    );
                    for conflict in &conflicts {
                        eprintln!(
                            "  overlaps {} - {} by {} min",
                            conflict.existing.start.to_rfc3339(),
                            conflict.existing.end.to_rfc3339(),
                            conflict.overlap_minutes
                        );
                    }
                    process::exit(EXIT_SLOT_UNAVAILABLE);
                }
                Err(e) => return Err(e).context("Booking failed"),
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine readable.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(io::stderr)
        .init();
}

fn describe_day(weekly: &WeeklyHours, day: chrono::Weekday) -> String {
    let ranges = weekly.for_weekday(day);
    if ranges.is_empty() {
        return "closed".to_string();
    }
    ranges
        .iter()
        .map(|r| format!("{}-{}", r.start, r.end))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).context("Failed to parse input JSON")
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid RFC 3339 instant: {}", s))
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(s) => parse_instant(s),
        None => Ok(Utc::now()),
    }
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
