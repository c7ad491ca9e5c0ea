// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig};

use crate::error::SchedulingError;
use crate::models::{
    BlockTimeRequest, Booking, BookingConfirmation, BookingRequest, BookingStatus, CalendarDay,
    CalendarQuery, FirstAvailableDate, MinuteRange, NewBooking, ProviderAssignment, ScheduleSnapshot,
    TimeSlot,
};
use crate::services::assignment::select_provider;
use crate::services::blocking::prepare_block;
use crate::services::capacity::CapacityFilter;
use crate::services::layout::calendar_day;
use crate::services::notification::{dispatch_confirmation, notifier_from_config, NotificationDispatcher};
use crate::services::search::first_available_date;
use crate::services::slots::has_elapsed;
use crate::services::store::{SchedulingStore, SupabaseSchedulingStore};
use crate::services::time::{format_minutes, parse_time_of_day, time_of};

/// Decide a booking against a snapshot: re-check capacity at the requested
/// instant, pick a provider and build the row. No I/O.
pub fn plan_booking(
    snapshot: &ScheduleSnapshot,
    config: &SchedulingConfig,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<(NewBooking, ProviderAssignment), SchedulingError> {
    let start_minute = parse_time_of_day(&request.time)?;
    if has_elapsed(request.date, start_minute, now) {
        return Err(SchedulingError::ValidationError(format!(
            "{} on {} has already passed",
            format_minutes(start_minute),
            request.date
        )));
    }

    let filter = CapacityFilter::new(snapshot, config);
    let roster = filter.roster(request.service_id, request.date)?;

    let slot = roster.evaluate(start_minute);
    if !slot.is_available {
        debug!(
            "Slot {} on {} unavailable: {}/{} capacity used",
            slot.time, request.date, slot.used_capacity, slot.qualified_capacity
        );
        return Err(SchedulingError::NoAvailability {
            date: request.date,
            time: slot.time,
        });
    }

    let interval = MinuteRange::starting_at(start_minute, roster.service.duration_minutes);
    let assignment = select_provider(&roster, &interval, config.assignment_strategy, &snapshot.provider_load)?;

    let start_time = time_of(start_minute).ok_or_else(|| SchedulingError::InvalidTime(request.time.clone()))?;

    let booking = NewBooking {
        tenant_id: snapshot.tenant_id,
        provider_id: assignment.provider_id,
        service_id: Some(roster.service.id),
        patient_id: request.patient_id,
        appointment_type: roster.service.name.clone(),
        appointment_date: request.date,
        start_time,
        duration_minutes: roster.service.duration_minutes,
        status: BookingStatus::Confirmed,
        notes: request.notes.clone(),
    };

    Ok((booking, assignment))
}

/// Booking flow around the engine: loads snapshots, persists decisions and
/// hands confirmations to the notifier.
pub struct SchedulingService {
    store: Arc<dyn SchedulingStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    config: SchedulingConfig,
}

impl SchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(SupabaseSchedulingStore::new(config)),
            notifier: notifier_from_config(config),
            config: config.scheduling.clone(),
        }
    }

    pub fn with_components(
        store: Arc<dyn SchedulingStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        config: SchedulingConfig,
    ) -> Self {
        Self { store, notifier, config }
    }

    /// Practice-local wall clock. Read once per request and passed down.
    pub fn now(&self) -> NaiveDateTime {
        (Utc::now() + Duration::minutes(i64::from(self.config.utc_offset_minutes))).naive_utc()
    }

    pub async fn available_slots(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        let snapshot = self.store.load_snapshot(tenant_id, date, date).await?;
        CapacityFilter::new(&snapshot, &self.config).day_slots(service_id, date, now)
    }

    pub async fn first_available_date(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<FirstAvailableDate, SchedulingError> {
        let today = now.date();
        let last_day = today
            .checked_add_days(Days::new(u64::from(self.config.search_horizon_days.saturating_sub(1))))
            .unwrap_or(today);

        let snapshot = self.store.load_snapshot(tenant_id, today, last_day).await?;
        first_available_date(&snapshot, &self.config, service_id, now)
    }

    /// Book the requested slot. A `SlotTaken` error means another request won
    /// the race; the caller should refresh the slot list.
    pub async fn book(
        &self,
        tenant_id: Uuid,
        request: BookingRequest,
        now: NaiveDateTime,
    ) -> Result<BookingConfirmation, SchedulingError> {
        info!(
            "Booking service {} on {} at {} for tenant {}",
            request.service_id, request.date, request.time, tenant_id
        );

        let snapshot = self.store.load_snapshot(tenant_id, request.date, request.date).await?;
        let (new_booking, assignment) = plan_booking(&snapshot, &self.config, &request, now)?;

        let booking = self.store.insert_booking(new_booking).await.inspect_err(|e| {
            if e.is_retryable() {
                warn!(
                    "Slot {} on {} was taken before provider {} could be bound",
                    request.time, request.date, assignment.provider_id
                );
            }
        })?;

        info!("Booking {} stored with provider {}", booking.id, assignment.provider_id);

        dispatch_confirmation(Arc::clone(&self.notifier), booking.clone(), assignment.clone());

        Ok(BookingConfirmation { booking, assignment })
    }

    pub async fn block_time(
        &self,
        tenant_id: Uuid,
        request: BlockTimeRequest,
    ) -> Result<Booking, SchedulingError> {
        debug!(
            "Blocking {}-{} on {} for provider {}",
            request.start_time, request.end_time, request.date, request.provider_id
        );

        let snapshot = self.store.load_snapshot(tenant_id, request.date, request.date).await?;
        let new_block = prepare_block(&snapshot, &self.config, &request).inspect_err(|e| {
            if let SchedulingError::OverlapRejected { existing, .. } = e {
                warn!("Rejected block for provider {}: overlaps {}", request.provider_id, existing);
            }
        })?;

        let block = self.store.insert_booking(new_block).await?;
        info!("Blocked time {} stored for provider {}", block.id, request.provider_id);
        Ok(block)
    }

    pub async fn remove_block(&self, tenant_id: Uuid, block_id: Uuid) -> Result<(), SchedulingError> {
        self.store.soft_delete_block(tenant_id, block_id, Utc::now()).await?;
        info!("Blocked time {} removed", block_id);
        Ok(())
    }

    pub async fn calendar(&self, tenant_id: Uuid, query: CalendarQuery) -> Result<CalendarDay, SchedulingError> {
        let snapshot = self.store.load_snapshot(tenant_id, query.date, query.date).await?;
        Ok(calendar_day(&snapshot, &self.config, query.date, query.provider_id))
    }
}
