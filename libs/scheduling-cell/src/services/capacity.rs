use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::error::SchedulingError;
use crate::models::{MinuteRange, Provider, ScheduleSnapshot, Service, TimeSlot};
use crate::services::busy::BusyIndex;
use crate::services::duration::DurationResolver;
use crate::services::qualification::qualified_providers;
use crate::services::slots::candidate_slots;
use crate::services::time::{format_12h, format_minutes, weekday_index};
use crate::services::working_window::{covers, working_windows};

/// Qualified providers of one service together with their windows on one date.
pub struct DayRoster<'a> {
    pub date: NaiveDate,
    pub service: &'a Service,
    pub providers: Vec<(&'a Provider, Vec<MinuteRange>)>,
    /// Practice hours of the weekday; `None` when closed.
    pub hours: Option<MinuteRange>,
    pub busy: BusyIndex,
}

impl DayRoster<'_> {
    /// Qualified, working and free providers for `interval`, in roster order.
    pub fn free_providers(&self, interval: &MinuteRange) -> Vec<&Provider> {
        self.providers
            .iter()
            .filter(|(provider, windows)| covers(windows, interval) && !self.busy.is_busy(provider.id, interval))
            .map(|(provider, _)| *provider)
            .collect()
    }

    pub fn evaluate(&self, start_minute: u32) -> TimeSlot {
        let interval = MinuteRange::starting_at(start_minute, self.service.duration_minutes);

        let mut qualified_capacity = 0;
        let mut used_capacity = 0;
        for (provider, windows) in &self.providers {
            if !covers(windows, &interval) {
                continue;
            }
            qualified_capacity += 1;
            if self.busy.is_busy(provider.id, &interval) {
                used_capacity += 1;
            }
        }

        let within_hours = self.hours.is_some_and(|hours| hours.contains(&interval));

        TimeSlot {
            time: format_minutes(start_minute),
            display_time: format_12h(start_minute),
            start_minute,
            is_available: within_hours && used_capacity < qualified_capacity,
            qualified_capacity,
            used_capacity,
        }
    }
}

/// Computes bookable slots from a snapshot. Pure: the same snapshot and `now`
/// always produce the same list.
pub struct CapacityFilter<'a> {
    snapshot: &'a ScheduleSnapshot,
    config: &'a SchedulingConfig,
    resolver: DurationResolver<'a>,
}

impl<'a> CapacityFilter<'a> {
    pub fn new(snapshot: &'a ScheduleSnapshot, config: &'a SchedulingConfig) -> Self {
        Self {
            snapshot,
            config,
            resolver: DurationResolver::new(config, &snapshot.services),
        }
    }

    pub fn busy_index(&self, date: NaiveDate) -> BusyIndex {
        BusyIndex::build(self.snapshot, &self.resolver, date)
    }

    /// Fails with `ServiceNotFound` or, when nobody is qualified, `NoQualifiedProvider`.
    pub fn roster(&self, service_id: Uuid, date: NaiveDate) -> Result<DayRoster<'a>, SchedulingError> {
        let service = self
            .snapshot
            .service(service_id)
            .ok_or(SchedulingError::ServiceNotFound(service_id))?;

        let qualified = qualified_providers(self.snapshot, service_id);
        if qualified.is_empty() {
            return Err(SchedulingError::NoQualifiedProvider { service_id });
        }

        let providers = qualified
            .into_iter()
            .map(|provider| (provider, working_windows(self.snapshot, provider.id, date)))
            .collect();

        let hours = self
            .snapshot
            .operating_hours_for(weekday_index(date))
            .filter(|hours| hours.enabled)
            .map(|hours| hours.range());

        Ok(DayRoster {
            date,
            service,
            providers,
            hours,
            busy: self.busy_index(date),
        })
    }

    /// Slot list for a service on a date, as shown to a patient.
    pub fn day_slots(
        &self,
        service_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        let roster = self.roster(service_id, date)?;
        let hours = self.snapshot.operating_hours_for(weekday_index(date));

        let slots: Vec<TimeSlot> = candidate_slots(date, hours, self.config.slot_granularity_minutes, now)
            .into_iter()
            .map(|start| roster.evaluate(start))
            .collect();

        debug!(
            "Service {} on {}: {} of {} slots available",
            service_id,
            date,
            slots.iter().filter(|slot| slot.is_available).count(),
            slots.len()
        );

        Ok(slots)
    }

    /// Capacity at an arbitrary start minute, on or off the slot grid.
    pub fn slot_at(&self, service_id: Uuid, date: NaiveDate, start_minute: u32) -> Result<TimeSlot, SchedulingError> {
        Ok(self.roster(service_id, date)?.evaluate(start_minute))
    }
}
