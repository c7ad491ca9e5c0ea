// libs/scheduling-cell/src/models.rs
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::time::{format_minutes, minutes_of};

/// Appointment type label carried by provider-imposed unavailability.
pub const BLOCKED_TIME_TYPE: &str = "Blocked Time";

// ==============================================================================
// CATALOG AND ROSTER
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Qualification {
    pub provider_id: Uuid,
    pub service_id: Uuid,
}

/// Weekly working hours of one provider. `day_of_week`: 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingWindow {
    pub provider_id: Uuid,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub is_working: bool,
}

impl WorkingWindow {
    pub fn range(&self) -> MinuteRange {
        MinuteRange::new(minutes_of(self.start_time), minutes_of(self.end_time))
    }
}

/// Practice opening hours for a weekday, in whole hours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperatingHours {
    pub day_of_week: u8,
    pub start_hour: u32,
    pub end_hour: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl OperatingHours {
    pub fn open_minute(&self) -> u32 {
        (self.start_hour * 60).min(MINUTES_PER_DAY)
    }

    pub fn close_minute(&self) -> u32 {
        (self.end_hour * 60).min(MINUTES_PER_DAY)
    }

    pub fn range(&self) -> MinuteRange {
        MinuteRange::new(self.open_minute(), self.close_minute())
    }
}

/// Date-specific exception to a provider's weekly schedule (vacation, sick day).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityOverride {
    pub provider_id: Uuid,
    pub override_date: NaiveDate,
    pub is_available: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

// ==============================================================================
// BOOKINGS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Confirmed")]
    Confirmed,
    #[serde(alias = "Completed")]
    Completed,
    #[serde(alias = "Missed", alias = "no_show")]
    Missed,
    #[serde(alias = "Cancelled", alias = "canceled")]
    Cancelled,
    #[serde(alias = "Blocked")]
    Blocked,
}

impl BookingStatus {
    /// Everything except a cancellation occupies the provider.
    pub fn occupies_provider(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Missed => write!(f, "missed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Blocked => write!(f, "blocked"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub provider_id: Option<Uuid>,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub appointment_type: Option<String>,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    /// Structured duration; legacy rows leave it empty and carry annotations in `notes`.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn start_minute(&self) -> u32 {
        minutes_of(self.start_time)
    }

    pub fn is_blocked_time(&self) -> bool {
        self.status == BookingStatus::Blocked
            || self
                .appointment_type
                .as_deref()
                .is_some_and(|label| label.trim().eq_ignore_ascii_case(BLOCKED_TIME_TYPE))
    }

    /// Not cancelled and not soft-deleted.
    pub fn is_active(&self) -> bool {
        self.status.occupies_provider() && self.deleted_at.is_none()
    }
}

/// Row written by the booking and block-time flows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBooking {
    pub tenant_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub appointment_type: String,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub status: BookingStatus,
    pub notes: Option<String>,
}

// ==============================================================================
// INTERVALS AND SLOTS
// ==============================================================================

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Half-open `[start, end)` range of minutes since midnight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MinuteRange {
    pub start: u32,
    pub end: u32,
}

impl MinuteRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn starting_at(start: u32, duration_minutes: u32) -> Self {
        Self::new(start, start.saturating_add(duration_minutes))
    }

    pub fn duration(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn overlaps(&self, other: &MinuteRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains(&self, other: &MinuteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for MinuteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_minutes(self.start), format_minutes(self.end))
    }
}

/// A booking normalized onto one provider's day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedInterval {
    pub provider_id: Uuid,
    pub booking_id: Uuid,
    pub date: NaiveDate,
    pub start_minute: u32,
    pub end_minute: u32,
    pub status: BookingStatus,
}

impl ResolvedInterval {
    pub fn range(&self) -> MinuteRange {
        MinuteRange::new(self.start_minute, self.end_minute)
    }
}

impl fmt::Display for ResolvedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.range(), self.date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    /// 24-hour `HH:MM`.
    pub time: String,
    /// 12-hour label, e.g. `10:00 AM`.
    pub display_time: String,
    pub start_minute: u32,
    pub is_available: bool,
    pub qualified_capacity: u32,
    pub used_capacity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderAssignment {
    pub provider_id: Uuid,
    pub provider_name: String,
}

/// Outcome of the forward date search. When `found` is false, `date` is
/// today and carries no guarantee of bookability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FirstAvailableDate {
    pub date: NaiveDate,
    pub found: bool,
    pub slots: Vec<TimeSlot>,
}

// ==============================================================================
// SNAPSHOT
// ==============================================================================

/// Consistent read of everything the engine needs for one tenant and date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSnapshot {
    pub tenant_id: Uuid,
    pub services: Vec<Service>,
    pub providers: Vec<Provider>,
    pub qualifications: Vec<Qualification>,
    pub working_windows: Vec<WorkingWindow>,
    pub operating_hours: Vec<OperatingHours>,
    pub overrides: Vec<AvailabilityOverride>,
    pub bookings: Vec<Booking>,
    /// Active patient bookings per provider, consulted by least-loaded assignment.
    #[serde(default)]
    pub provider_load: HashMap<Uuid, u32>,
}

impl ScheduleSnapshot {
    pub fn service(&self, service_id: Uuid) -> Option<&Service> {
        self.services.iter().find(|service| service.id == service_id)
    }

    pub fn provider(&self, provider_id: Uuid) -> Option<&Provider> {
        self.providers
            .iter()
            .find(|provider| provider.id == provider_id && provider.tenant_id == self.tenant_id)
    }

    pub fn operating_hours_for(&self, day_of_week: u8) -> Option<&OperatingHours> {
        self.operating_hours
            .iter()
            .find(|hours| hours.day_of_week == day_of_week)
    }

    /// Recount `provider_load` from the snapshot's own bookings.
    pub fn tally_provider_load(&mut self) {
        let mut load = HashMap::new();
        for booking in &self.bookings {
            if !booking.is_active() || booking.is_blocked_time() {
                continue;
            }
            if let Some(provider_id) = booking.provider_id {
                *load.entry(provider_id).or_insert(0) += 1;
            }
        }
        self.provider_load = load;
    }
}

// ==============================================================================
// CALENDAR LAYOUT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEntry {
    pub booking_id: Uuid,
    pub start_minute: u32,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutBox {
    pub booking_id: Uuid,
    pub column: usize,
    pub columns: usize,
    pub top_percent: f64,
    pub height_percent: f64,
    pub left_percent: f64,
    pub width_percent: f64,
    pub z_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub window: MinuteRange,
    pub boxes: Vec<LayoutBox>,
}

// ==============================================================================
// REQUEST DTOS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_id: Uuid,
    pub date: NaiveDate,
    /// `HH:MM` or `h:MM AM`.
    pub time: String,
    pub patient_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub booking: Booking,
    pub assignment: ProviderAssignment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTimeRequest {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarQuery {
    pub date: NaiveDate,
    pub provider_id: Option<Uuid>,
}

fn default_true() -> bool {
    true
}
