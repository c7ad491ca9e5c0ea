// Duration resolution for bookings, including the legacy notes annotations:
//   DURATION:<minutes>   explicit length of a blocked-time entry
//   END_TIME:<HH:MM>     24-hour end, length derived by subtraction
// Both are case-insensitive and may sit anywhere inside free-text notes.

use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use tracing::warn;

use shared_config::SchedulingConfig;

use crate::error::SchedulingError;
use crate::models::{Booking, Service, MINUTES_PER_DAY};
use crate::services::time::{format_minutes, minutes_of};

static DURATION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bDURATION:\s*(\d+)").ok());

static DURATION_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bDURATION:").ok());

static END_TIME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bEND_TIME:\s*(\d{1,2}:\d{2})").ok());

static END_TIME_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bEND_TIME:").ok());

/// First captured value in `notes` that `accept` turns into a length.
/// `Ok(None)` when the tag never appears; malformed when it appears but no
/// occurrence is usable.
fn scan_annotation<F>(
    notes: &str,
    pattern: &LazyLock<Option<Regex>>,
    tag: &LazyLock<Option<Regex>>,
    accept: F,
) -> Result<Option<u32>, SchedulingError>
where
    F: Fn(&str) -> Option<u32>,
{
    let found = pattern.as_ref().and_then(|pattern| {
        pattern
            .captures_iter(notes)
            .filter_map(|captures| captures.get(1))
            .find_map(|value| accept(value.as_str()))
    });
    if found.is_some() {
        return Ok(found);
    }

    match tag.as_ref().and_then(|tag| tag.find(notes)) {
        Some(_) => Err(SchedulingError::MalformedDurationAnnotation(notes.trim().to_string())),
        None => Ok(None),
    }
}

/// `Ok(None)` when no `DURATION:` annotation is present. Zero counts as malformed.
pub fn parse_duration_annotation(notes: &str) -> Result<Option<u32>, SchedulingError> {
    scan_annotation(notes, &DURATION_PATTERN, &DURATION_TAG, |digits| {
        digits.parse::<u32>().ok().filter(|minutes| *minutes > 0)
    })
}

/// Minutes between `start_minute` and an `END_TIME:` annotation, accepted only
/// within `(0, max_minutes]`. `Ok(None)` when no annotation is present.
pub fn parse_end_time_annotation(
    notes: &str,
    start_minute: u32,
    max_minutes: u32,
) -> Result<Option<u32>, SchedulingError> {
    scan_annotation(notes, &END_TIME_PATTERN, &END_TIME_TAG, |raw| {
        let end_minute = NaiveTime::parse_from_str(raw, "%H:%M").ok().map(minutes_of)?;
        end_minute
            .checked_sub(start_minute)
            .filter(|minutes| *minutes > 0 && *minutes <= max_minutes)
    })
}

/// Notes written for new blocked-time rows so legacy readers still see a length.
pub fn encode_block_notes(start_minute: u32, duration_minutes: u32, reason: Option<&str>) -> String {
    let annotation = format!(
        "DURATION:{} END_TIME:{}",
        duration_minutes,
        format_minutes(start_minute.saturating_add(duration_minutes))
    );

    match reason.map(str::trim).filter(|reason| !reason.is_empty()) {
        Some(reason) => format!("{} | {}", annotation, reason),
        None => annotation,
    }
}

pub struct DurationResolver<'a> {
    config: &'a SchedulingConfig,
    services: &'a [Service],
}

impl<'a> DurationResolver<'a> {
    pub fn new(config: &'a SchedulingConfig, services: &'a [Service]) -> Self {
        Self { config, services }
    }

    /// Length of a booking in minutes, cut off at midnight. Never fails:
    /// unreadable annotations are logged and the default-duration policy applies.
    pub fn resolve(&self, booking: &Booking) -> u32 {
        let until_midnight = MINUTES_PER_DAY.saturating_sub(booking.start_minute());
        self.resolve_unbounded(booking).min(until_midnight)
    }

    fn resolve_unbounded(&self, booking: &Booking) -> u32 {
        if let Some(minutes) = booking.duration_minutes {
            return minutes;
        }

        let notes = booking.notes.as_deref().unwrap_or_default();

        if booking.is_blocked_time() {
            match parse_duration_annotation(notes) {
                Ok(Some(minutes)) => return minutes,
                Ok(None) => {}
                Err(e) => warn!("Booking {}: {}", booking.id, e),
            }
        }

        match parse_end_time_annotation(notes, booking.start_minute(), self.config.max_derived_duration_minutes) {
            Ok(Some(minutes)) => return minutes,
            Ok(None) => {}
            Err(e) => warn!("Booking {}: {}", booking.id, e),
        }

        self.default_duration(booking)
    }

    fn default_duration(&self, booking: &Booking) -> u32 {
        let by_id = booking
            .service_id
            .and_then(|id| self.services.iter().find(|service| service.id == id));

        let by_label = || {
            booking.appointment_type.as_deref().and_then(|label| {
                self.services
                    .iter()
                    .find(|service| service.name.eq_ignore_ascii_case(label.trim()))
            })
        };

        match by_id.or_else(by_label) {
            Some(service) => service.duration_minutes,
            None if booking.is_blocked_time() => self.config.legacy_block_minutes,
            None => self.config.default_service_minutes,
        }
    }
}
