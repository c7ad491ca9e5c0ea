#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use scheduling_cell::models::{
    AvailabilityOverride, Booking, BookingStatus, NewBooking, OperatingHours, Provider,
    ProviderAssignment, Qualification, ScheduleSnapshot, Service, WorkingWindow,
};
use scheduling_cell::services::{NotificationDispatcher, SchedulingStore};
use scheduling_cell::SchedulingError;

pub const MONDAY: u8 = 1;

pub fn tenant_id() -> Uuid {
    Uuid::from_u128(0x7e4a_0001)
}

pub fn provider_a() -> Uuid {
    Uuid::from_u128(0xa1)
}

pub fn provider_b() -> Uuid {
    Uuid::from_u128(0xb2)
}

pub fn consult() -> Uuid {
    Uuid::from_u128(0x5e01)
}

pub fn massage() -> Uuid {
    Uuid::from_u128(0x5e02)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2026-10-19 is a Monday.
pub fn monday() -> NaiveDate {
    date(2026, 10, 19)
}

/// The Sunday evening before `monday()`.
pub fn sunday_evening() -> NaiveDateTime {
    date(2026, 10, 18).and_hms_opt(20, 0, 0).unwrap()
}

pub fn hhmm(value: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M").unwrap()
}

pub fn booking(provider_id: Uuid, on: NaiveDate, start: &str, minutes: u32) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        tenant_id: tenant_id(),
        provider_id: Some(provider_id),
        service_id: None,
        patient_id: Some(Uuid::new_v4()),
        appointment_type: Some("Consultation".to_string()),
        appointment_date: on,
        start_time: hhmm(start),
        duration_minutes: Some(minutes),
        status: BookingStatus::Confirmed,
        notes: None,
        deleted_at: None,
    }
}

pub fn block(provider_id: Uuid, on: NaiveDate, start: &str, minutes: u32) -> Booking {
    Booking {
        patient_id: None,
        appointment_type: Some("Blocked Time".to_string()),
        status: BookingStatus::Blocked,
        ..booking(provider_id, on, start, minutes)
    }
}

/// Builds tenant snapshots the way the store would return them.
pub struct SnapshotBuilder {
    snapshot: ScheduleSnapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: ScheduleSnapshot {
                tenant_id: tenant_id(),
                ..Default::default()
            },
        }
    }

    pub fn service(mut self, id: Uuid, name: &str, duration_minutes: u32) -> Self {
        self.snapshot.services.push(Service {
            id,
            tenant_id: tenant_id(),
            name: name.to_string(),
            duration_minutes,
        });
        self
    }

    pub fn provider(mut self, id: Uuid, name: &str, services: &[Uuid]) -> Self {
        self.snapshot.providers.push(Provider {
            id,
            tenant_id: tenant_id(),
            name: name.to_string(),
            is_active: true,
        });
        for service_id in services {
            self.snapshot.qualifications.push(Qualification {
                provider_id: id,
                service_id: *service_id,
            });
        }
        self
    }

    pub fn window(mut self, provider_id: Uuid, day_of_week: u8, start: &str, end: &str) -> Self {
        self.snapshot.working_windows.push(WorkingWindow {
            provider_id,
            day_of_week,
            start_time: hhmm(start),
            end_time: hhmm(end),
            is_working: true,
        });
        self
    }

    /// Same window on every day of the week.
    pub fn every_day(mut self, provider_id: Uuid, start: &str, end: &str) -> Self {
        for day in 0..7 {
            self = self.window(provider_id, day, start, end);
        }
        self
    }

    pub fn hours(mut self, day_of_week: u8, start_hour: u32, end_hour: u32) -> Self {
        self.snapshot.operating_hours.push(OperatingHours {
            day_of_week,
            start_hour,
            end_hour,
            enabled: true,
        });
        self
    }

    pub fn open_every_day(mut self, start_hour: u32, end_hour: u32) -> Self {
        for day in 0..7 {
            self = self.hours(day, start_hour, end_hour);
        }
        self
    }

    pub fn day_off(mut self, provider_id: Uuid, on: NaiveDate) -> Self {
        self.snapshot.overrides.push(AvailabilityOverride {
            provider_id,
            override_date: on,
            is_available: false,
            reason: Some("Vacation".to_string()),
        });
        self
    }

    pub fn booking(mut self, booking: Booking) -> Self {
        self.snapshot.bookings.push(booking);
        self
    }

    pub fn build(mut self) -> ScheduleSnapshot {
        self.snapshot.tally_provider_load();
        self.snapshot
    }
}

/// Two providers, both qualified for a 30-minute consultation, working
/// 09:00-17:00 every day inside practice hours 8-18.
pub fn two_provider_practice() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .service(consult(), "Consultation", 30)
        .service(massage(), "Massage", 60)
        .provider(provider_a(), "Dr. Avery", &[consult(), massage()])
        .provider(provider_b(), "Dr. Blake", &[consult()])
        .every_day(provider_a(), "09:00", "17:00")
        .every_day(provider_b(), "09:00", "17:00")
        .open_every_day(8, 18)
}

/// In-memory store enforcing the `(provider, date, start)` uniqueness of
/// active rows at insert time.
pub struct InMemoryStore {
    base: ScheduleSnapshot,
    bookings: Mutex<Vec<Booking>>,
    /// Rows that land between a caller's snapshot read and its insert.
    concurrent_claims: Mutex<Vec<Booking>>,
}

impl InMemoryStore {
    pub fn new(snapshot: ScheduleSnapshot) -> Self {
        let bookings = snapshot.bookings.clone();
        Self {
            base: ScheduleSnapshot {
                bookings: Vec::new(),
                ..snapshot
            },
            bookings: Mutex::new(bookings),
            concurrent_claims: Mutex::new(Vec::new()),
        }
    }

    pub fn claim_before_next_insert(&self, booking: Booking) {
        self.concurrent_claims.lock().unwrap().push(booking);
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }

    pub fn active_bookings(&self) -> Vec<Booking> {
        self.bookings().into_iter().filter(Booking::is_active).collect()
    }

    pub async fn load_snapshot_for(&self, on: NaiveDate) -> ScheduleSnapshot {
        self.load_snapshot(tenant_id(), on, on).await.unwrap()
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn load_snapshot(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ScheduleSnapshot, SchedulingError> {
        let bookings = self
            .bookings()
            .into_iter()
            .filter(|b| b.tenant_id == tenant_id && b.appointment_date >= from && b.appointment_date <= to)
            .filter(Booking::is_active)
            .collect();

        let mut snapshot = ScheduleSnapshot {
            tenant_id,
            bookings,
            ..self.base.clone()
        };
        snapshot.tally_provider_load();
        Ok(snapshot)
    }

    async fn insert_booking(&self, new: NewBooking) -> Result<Booking, SchedulingError> {
        let mut bookings = self.bookings.lock().unwrap();
        bookings.append(&mut self.concurrent_claims.lock().unwrap());

        let taken = bookings.iter().any(|existing| {
            existing.is_active()
                && existing.provider_id == Some(new.provider_id)
                && existing.appointment_date == new.appointment_date
                && existing.start_time == new.start_time
        });
        if taken {
            return Err(SchedulingError::SlotTaken);
        }

        let stored = Booking {
            id: Uuid::new_v4(),
            tenant_id: new.tenant_id,
            provider_id: Some(new.provider_id),
            service_id: new.service_id,
            patient_id: new.patient_id,
            appointment_type: Some(new.appointment_type),
            appointment_date: new.appointment_date,
            start_time: new.start_time,
            duration_minutes: Some(new.duration_minutes),
            status: new.status,
            notes: new.notes,
            deleted_at: None,
        };
        bookings.push(stored.clone());
        Ok(stored)
    }

    async fn soft_delete_block(
        &self,
        tenant_id: Uuid,
        block_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        let mut bookings = self.bookings.lock().unwrap();
        let row = bookings
            .iter_mut()
            .find(|b| {
                b.id == block_id
                    && b.tenant_id == tenant_id
                    && b.status == BookingStatus::Blocked
                    && b.deleted_at.is_none()
            })
            .ok_or(SchedulingError::BlockNotFound(block_id))?;
        row.deleted_at = Some(deleted_at);
        Ok(())
    }
}

/// Forwards every confirmed booking id to a channel.
pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<Uuid>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Uuid>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn booking_confirmed(&self, booking: &Booking, _assignment: &ProviderAssignment) -> Result<()> {
        self.sender.send(booking.id)?;
        Ok(())
    }
}

/// Always fails; bookings must still succeed.
pub struct FailingNotifier;

#[async_trait]
impl NotificationDispatcher for FailingNotifier {
    async fn booking_confirmed(&self, _booking: &Booking, _assignment: &ProviderAssignment) -> Result<()> {
        Err(anyhow::anyhow!("notification endpoint unreachable"))
    }
}
