use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::error::SchedulingError;
use crate::models::{
    AvailabilityOverride, Booking, NewBooking, OperatingHours, Provider, Qualification,
    ScheduleSnapshot, Service, WorkingWindow,
};

/// Read/write seam between the engine and the relational store.
///
/// `insert_booking` must be atomic with respect to the unique
/// `(provider_id, appointment_date, start_time)` constraint on active rows and
/// report a lost race as `SchedulingError::SlotTaken`.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn load_snapshot(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ScheduleSnapshot, SchedulingError>;

    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, SchedulingError>;

    async fn soft_delete_block(
        &self,
        tenant_id: Uuid,
        block_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), SchedulingError>;
}

pub struct SupabaseSchedulingStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    async fn fetch_rows<T>(&self, path: &str) -> Result<Vec<T>, SchedulingError>
    where
        T: DeserializeOwned,
    {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse rows from {}: {}", path, e)))
    }
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    async fn load_snapshot(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ScheduleSnapshot, SchedulingError> {
        debug!("Loading schedule snapshot for tenant {} from {} to {}", tenant_id, from, to);

        let services_path = format!("/rest/v1/services?tenant_id=eq.{}&order=id.asc", tenant_id);
        let providers_path = format!("/rest/v1/providers?tenant_id=eq.{}&order=id.asc", tenant_id);
        let qualifications_path = format!(
            "/rest/v1/provider_services?tenant_id=eq.{}&select=provider_id,service_id",
            tenant_id
        );
        let windows_path = format!(
            "/rest/v1/provider_schedules?tenant_id=eq.{}&order=provider_id.asc,day_of_week.asc",
            tenant_id
        );
        let hours_path = format!("/rest/v1/business_hours?tenant_id=eq.{}&order=day_of_week.asc", tenant_id);
        let overrides_path = format!(
            "/rest/v1/provider_availability_overrides?tenant_id=eq.{}&override_date=gte.{}&override_date=lte.{}",
            tenant_id, from, to
        );
        let bookings_path = format!(
            "/rest/v1/appointments?tenant_id=eq.{}&appointment_date=gte.{}&appointment_date=lte.{}&status=neq.cancelled&deleted_at=is.null&order=appointment_date.asc,start_time.asc",
            tenant_id, from, to
        );

        let (services, providers, qualifications, working_windows, operating_hours, overrides, bookings) = tokio::try_join!(
            self.fetch_rows::<Service>(&services_path),
            self.fetch_rows::<Provider>(&providers_path),
            self.fetch_rows::<Qualification>(&qualifications_path),
            self.fetch_rows::<WorkingWindow>(&windows_path),
            self.fetch_rows::<OperatingHours>(&hours_path),
            self.fetch_rows::<AvailabilityOverride>(&overrides_path),
            self.fetch_rows::<Booking>(&bookings_path),
        )?;

        let mut snapshot = ScheduleSnapshot {
            tenant_id,
            services,
            providers,
            qualifications,
            working_windows,
            operating_hours,
            overrides,
            bookings,
            ..Default::default()
        };
        snapshot.tally_provider_load();

        debug!(
            "Snapshot for tenant {}: {} providers, {} bookings",
            tenant_id,
            snapshot.providers.len(),
            snapshot.bookings.len()
        );

        Ok(snapshot)
    }

    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, SchedulingError> {
        let body = serde_json::to_value(&booking)
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to encode booking: {}", e)))?;

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                None,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| match e.downcast_ref::<SupabaseError>() {
                Some(SupabaseError::Conflict(detail)) => {
                    warn!(
                        "Insert for provider {} at {} {} lost a race: {}",
                        booking.provider_id, booking.appointment_date, booking.start_time, detail
                    );
                    SchedulingError::SlotTaken
                }
                _ => SchedulingError::DatabaseError(e.to_string()),
            })?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::DatabaseError("Insert returned no rows".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse inserted booking: {}", e)))
    }

    async fn soft_delete_block(
        &self,
        tenant_id: Uuid,
        block_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&tenant_id=eq.{}&status=eq.blocked&deleted_at=is.null",
            block_id, tenant_id
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(json!({ "deleted_at": deleted_at.to_rfc3339() })),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::BlockNotFound(block_id));
        }

        Ok(())
    }
}
