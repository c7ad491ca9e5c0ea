use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::error::SchedulingError;
use crate::models::MINUTES_PER_DAY;

const TIME_FORMATS: [&str; 5] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p", "%I:%M:%S %p"];

/// Parse a time of day (`14:30`, `14:30:00`, `2:30 PM`) into minutes since midnight.
pub fn parse_time_of_day(input: &str) -> Result<u32, SchedulingError> {
    let trimmed = input.trim();

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .map(minutes_of)
        .ok_or_else(|| SchedulingError::InvalidTime(input.to_string()))
}

pub fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Inverse of [`minutes_of`]. `None` past the end of the day.
pub fn time_of(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// `HH:MM`; midnight at the end of the day renders as `24:00`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn format_12h(minutes: u32) -> String {
    let hour = (minutes / 60) % 24;
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", display_hour, minutes % 60, suffix)
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
