use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{MinuteRange, ScheduleSnapshot};
use crate::services::time::weekday_index;

/// Working intervals of a provider on `date`, ordered by start. Empty when
/// the provider is not working (no enabled window, or an override closes the day).
pub fn working_windows(snapshot: &ScheduleSnapshot, provider_id: Uuid, date: NaiveDate) -> Vec<MinuteRange> {
    let day_off = snapshot.overrides.iter().any(|entry| {
        entry.provider_id == provider_id && entry.override_date == date && !entry.is_available
    });
    if day_off {
        return Vec::new();
    }

    let day_of_week = weekday_index(date);
    let mut windows: Vec<MinuteRange> = snapshot
        .working_windows
        .iter()
        .filter(|window| {
            window.provider_id == provider_id && window.day_of_week == day_of_week && window.is_working
        })
        .map(|window| window.range())
        .filter(|range| range.start < range.end)
        .collect();

    windows.sort_by_key(|range| range.start);
    windows
}

/// True when one window holds the whole interval; partial coverage does not count.
pub fn covers(windows: &[MinuteRange], interval: &MinuteRange) -> bool {
    windows.iter().any(|window| window.contains(interval))
}
