use chrono::{NaiveDate, NaiveDateTime};

use crate::models::OperatingHours;
use crate::services::time::time_of;

/// Candidate start minutes for a day, stepping `granularity_minutes` across
/// `[open, close)`. Closed days and past dates yield nothing; on the current
/// date, starts at or before `now` are dropped.
pub fn candidate_slots(
    date: NaiveDate,
    hours: Option<&OperatingHours>,
    granularity_minutes: u32,
    now: NaiveDateTime,
) -> Vec<u32> {
    let Some(hours) = hours.filter(|hours| hours.enabled) else {
        return Vec::new();
    };

    let today = now.date();
    if date < today {
        return Vec::new();
    }

    let step = granularity_minutes.max(1) as usize;
    let (open, close) = (hours.open_minute(), hours.close_minute());

    (open..close)
        .step_by(step)
        .filter(|start| date > today || !has_elapsed(date, *start, now))
        .collect()
}

pub fn has_elapsed(date: NaiveDate, start_minute: u32, now: NaiveDateTime) -> bool {
    match time_of(start_minute) {
        Some(time) => date.and_time(time) <= now,
        None => date < now.date(),
    }
}
