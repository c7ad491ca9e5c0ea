use chrono::{Days, NaiveDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::error::SchedulingError;
use crate::models::{FirstAvailableDate, ScheduleSnapshot};
use crate::services::capacity::CapacityFilter;
use crate::services::time::weekday_index;

/// Walk forward from today for `search_horizon_days` and return the first date
/// with an open slot. When nothing is found the result is today with
/// `found = false`; callers must read that as "no availability".
///
/// `snapshot` must hold the bookings of the whole horizon.
pub fn first_available_date(
    snapshot: &ScheduleSnapshot,
    config: &SchedulingConfig,
    service_id: Uuid,
    now: NaiveDateTime,
) -> Result<FirstAvailableDate, SchedulingError> {
    let filter = CapacityFilter::new(snapshot, config);
    let today = now.date();

    for offset in 0..u64::from(config.search_horizon_days) {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };

        let open = snapshot
            .operating_hours_for(weekday_index(date))
            .is_some_and(|hours| hours.enabled);
        if !open {
            debug!("Skipping {}: practice closed", date);
            continue;
        }

        let slots = filter.day_slots(service_id, date, now)?;
        if slots.iter().any(|slot| slot.is_available) {
            return Ok(FirstAvailableDate {
                date,
                found: true,
                slots,
            });
        }
    }

    info!(
        "No availability for service {} within {} days, falling back to {}",
        service_id, config.search_horizon_days, today
    );

    Ok(FirstAvailableDate {
        date: today,
        found: false,
        slots: filter.day_slots(service_id, today, now)?,
    })
}
