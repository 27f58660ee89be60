//! Booking admission at the store boundary.
//!
//! A slot resolved as open can still lose a race to a concurrent booking. The
//! store's insert is the only serialization point: it must reject a booking
//! whose buffered span overlaps an active one with
//! [`BookingError::SlotUnavailable`], which callers answer by re-resolving
//! slots rather than retrying.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::interval::{
    blackout_intervals, find_conflicts, AppointmentStatus, BlackoutInterval, BlockingStatuses,
    Conflict, Interval, OccupiedInterval,
};
use crate::resolver::is_offered;
use crate::template::AvailabilityTemplate;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    /// `conflicts` lists the held intervals the buffered span ran into.
    #[error("Slot unavailable: {start} - {end}")]
    SlotUnavailable {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        conflicts: Vec<Conflict>,
    },

    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    #[error("Booking store error: {0}")]
    Store(String),
}

impl BookingError {
    /// True for the "pick another slot" outcome.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BookingError::SlotUnavailable { .. })
    }
}

/// A visitor's request to take a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookingRequest {
    /// `[start, end + buffer)`, or `None` when the end cannot be extended.
    pub fn buffered_span(&self, buffer_minutes: u32) -> Option<Interval> {
        self.end
            .checked_add_signed(Duration::minutes(buffer_minutes as i64))
            .map(|end| Interval::new(self.start, end))
    }

    fn unavailable(&self, conflicts: Vec<Conflict>) -> BookingError {
        BookingError::SlotUnavailable {
            start: self.start,
            end: self.end,
            conflicts,
        }
    }
}

/// A stored booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: u64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

impl Appointment {
    pub fn occupied(&self) -> OccupiedInterval {
        OccupiedInterval {
            start: self.start,
            end: self.end,
            status: self.status,
        }
    }
}

/// The record store the resolver's snapshots come from.
pub trait BookingStore: Send + Sync {
    /// Appointments with a blocking status overlapping `[from, to)`.
    fn blocking_appointments(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OccupiedInterval>, BookingError>;

    /// Blackouts overlapping `[from, to)`.
    fn blackouts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BlackoutInterval>, BookingError>;

    /// Persist a booking, failing with `SlotUnavailable` when `held` (the
    /// request's buffered span) overlaps a blocking appointment or blackout.
    ///
    /// The overlap check and the write must be atomic.
    fn insert(
        &self,
        request: &BookingRequest,
        held: Interval,
    ) -> Result<Appointment, BookingError>;
}

/// Validate a request against the template, then hand it to the store.
///
/// The request must describe a slot the template offers at `now`. Its
/// buffered span is checked against a fresh snapshot before the insert; the
/// insert itself remains the authority on conflicts.
pub fn book_slot<S: BookingStore + ?Sized>(
    store: &S,
    template: &AvailabilityTemplate,
    request: &BookingRequest,
    now: DateTime<Utc>,
) -> Result<Appointment, BookingError> {
    if request.name.trim().is_empty() {
        return Err(BookingError::InvalidRequest("name is required".to_string()));
    }
    if !request.email.contains('@') {
        return Err(BookingError::InvalidRequest(format!(
            "invalid email address '{}'",
            request.email
        )));
    }
    if request.timezone != template.timezone {
        return Err(BookingError::InvalidRequest(format!(
            "timezone '{}' does not match availability timezone '{}'",
            request.timezone, template.timezone
        )));
    }

    let offered = is_offered(template, request.start, request.end, now)
        .map_err(|e| BookingError::InvalidRequest(e.to_string()))?;
    if !offered {
        return Err(BookingError::InvalidRequest(format!(
            "{} - {} is not an offered slot",
            request.start, request.end
        )));
    }

    let buffered = request.buffered_span(template.buffer_minutes).ok_or_else(|| {
        BookingError::InvalidRequest(format!("{} plus buffer is out of range", request.end))
    })?;
    let occupied = store.blocking_appointments(buffered.start, buffered.end)?;
    let blackouts = store.blackouts(buffered.start, buffered.end)?;

    let mut held: Vec<Interval> = occupied.iter().map(OccupiedInterval::interval).collect();
    held.extend(blackout_intervals(&blackouts));
    let conflicts = find_conflicts(&buffered, &held);
    if !conflicts.is_empty() {
        log_conflicts(request, &conflicts, "booking rejected against snapshot");
        return Err(request.unavailable(conflicts));
    }

    store.insert(request, buffered).inspect_err(|e| {
        if let BookingError::SlotUnavailable { conflicts, .. } = e {
            log_conflicts(request, conflicts, "booking lost the race at the store");
        }
    })
}

fn log_conflicts(request: &BookingRequest, conflicts: &[Conflict], message: &str) {
    for conflict in conflicts {
        debug!(
            start = %request.start,
            existing_start = %conflict.existing.start,
            existing_end = %conflict.existing.end,
            overlap_minutes = conflict.overlap_minutes,
            "{}",
            message
        );
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    appointments: Vec<Appointment>,
    blackouts: Vec<BlackoutInterval>,
}

/// Mutex-guarded in-memory store.
///
/// A booking is admitted only when its held (buffered) span is clear of
/// every blocking appointment and blackout, checked under the same lock as
/// the write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    statuses: BlockingStatuses,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(statuses: BlockingStatuses) -> Self {
        Self {
            statuses,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Seed an existing appointment record.
    pub fn add_existing(&self, occupied: OccupiedInterval) -> Result<u64, BookingError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = state.next_id;
        state.appointments.push(Appointment {
            id,
            start: occupied.start,
            end: occupied.end,
            timezone: String::new(),
            name: String::new(),
            email: String::new(),
            phone: None,
            notes: None,
            status: occupied.status,
        });
        Ok(id)
    }

    pub fn add_blackout(&self, blackout: BlackoutInterval) -> Result<(), BookingError> {
        self.lock()?.blackouts.push(blackout);
        Ok(())
    }

    /// Mark an appointment cancelled, freeing its span.
    pub fn cancel(&self, id: u64) -> Result<bool, BookingError> {
        let mut state = self.lock()?;
        match state.appointments.iter_mut().find(|a| a.id == id) {
            Some(appointment) => {
                debug!(id, previous = %appointment.status, "appointment cancelled");
                appointment.status = AppointmentStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn appointments(&self) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.lock()?.appointments.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, BookingError> {
        self.state
            .lock()
            .map_err(|_| BookingError::Store("memory store lock poisoned".to_string()))
    }
}

impl BookingStore for MemoryStore {
    fn blocking_appointments(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OccupiedInterval>, BookingError> {
        let range = Interval::new(from, to);
        Ok(self
            .lock()?
            .appointments
            .iter()
            .filter(|a| self.statuses.blocks(a.status))
            .map(Appointment::occupied)
            .filter(|o| o.interval().overlaps(&range))
            .collect())
    }

    fn blackouts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BlackoutInterval>, BookingError> {
        let range = Interval::new(from, to);
        Ok(self
            .lock()?
            .blackouts
            .iter()
            .filter(|b| b.interval().overlaps(&range))
            .cloned()
            .collect())
    }

    fn insert(
        &self,
        request: &BookingRequest,
        held: Interval,
    ) -> Result<Appointment, BookingError> {
        if request.start >= request.end {
            return Err(BookingError::InvalidRequest(
                "start must be before end".to_string(),
            ));
        }
        if held.start != request.start || held.end < request.end {
            return Err(BookingError::InvalidRequest(
                "held span must cover the requested slot".to_string(),
            ));
        }

        let mut state = self.lock()?;
        let mut taken: Vec<Interval> = state
            .appointments
            .iter()
            .filter(|a| self.statuses.blocks(a.status))
            .map(|a| a.occupied().interval())
            .collect();
        taken.extend(state.blackouts.iter().map(BlackoutInterval::interval));
        let conflicts = find_conflicts(&held, &taken);
        if !conflicts.is_empty() {
            return Err(request.unavailable(conflicts));
        }

        state.next_id += 1;
        let appointment = Appointment {
            id: state.next_id,
            start: request.start,
            end: request.end,
            timezone: request.timezone.clone(),
            name: request.name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            notes: request.notes.clone(),
            status: AppointmentStatus::Scheduled,
        };
        state.appointments.push(appointment.clone());
        Ok(appointment)
    }
}
