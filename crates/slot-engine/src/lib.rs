//! # slot-engine
//!
//! Timezone-correct appointment slot resolution.
//!
//! Given a weekly availability template, snapshots of booked appointments and
//! blackout windows, and the current instant, the engine produces the ordered
//! list of bookable slots. All civil-time arithmetic goes through the
//! template's IANA zone via `chrono-tz`, so slots stay correct across DST
//! transitions and regardless of the host's local zone.
//!
//! ## Modules
//!
//! - [`civil`]: wall-clock <-> instant conversion in a named zone
//! - [`template`]: the weekly availability template
//! - [`interval`]: occupied/blackout intervals and half-open overlap
//! - [`resolver`]: slot generation
//! - [`source`]: picking and loading the current template record
//! - [`booking`]: booking admission and the store boundary
//! - [`error`]: Error types

pub mod booking;
pub mod civil;
pub mod error;
pub mod interval;
pub mod resolver;
pub mod source;
pub mod template;

pub use booking::{book_slot, Appointment, BookingError, BookingRequest, BookingStore, MemoryStore};
pub use civil::{civil_to_instant, instant_to_civil_parts, parse_timezone, CivilParts};
pub use error::SlotError;
pub use interval::{
    AppointmentStatus, BlackoutInterval, BlockingStatuses, Conflict, Interval, OccupiedInterval,
};
pub use resolver::{first_open_slot, resolve_slots, resolve_slots_for, Slot, MAX_SLOTS};
pub use source::{latest_template, SlotSnapshot, TemplateRecord};
pub use template::{
    AvailabilityTemplate, TimeOfDay, TimeRange, WeeklyHours, MAX_BOOKING_WINDOW_DAYS,
    MAX_LEAD_HOURS, MAX_SLOT_MINUTES,
};
