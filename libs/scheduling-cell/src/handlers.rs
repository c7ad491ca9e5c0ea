// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{BlockTimeRequest, BookingRequest, CalendarQuery};
use crate::services::SchedulingService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path((tenant_id, service_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);
    let now = service.now();

    let slots = service.available_slots(tenant_id, service_id, query.date, now).await?;
    let available = slots.iter().filter(|slot| slot.is_available).count();

    Ok(Json(json!({
        "service_id": service_id,
        "date": query.date,
        "slots": slots,
        "total_slots": slots.len(),
        "available_slots": available
    })))
}

#[axum::debug_handler]
pub async fn get_first_available_date(
    State(state): State<Arc<AppConfig>>,
    Path((tenant_id, service_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);
    let now = service.now();

    let result = service.first_available_date(tenant_id, service_id, now).await?;

    Ok(Json(json!({
        "service_id": service_id,
        "date": result.date,
        "found": result.found,
        "slots": result.slots
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<AppConfig>>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = SchedulingService::new(&state);
    let now = service.now();

    let confirmation = service.book(tenant_id, request, now).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "booking": confirmation.booking,
            "provider_id": confirmation.assignment.provider_id,
            "provider_name": confirmation.assignment.provider_name
        })),
    ))
}

// ==============================================================================
// BLOCKED TIME HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<AppConfig>>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<BlockTimeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = SchedulingService::new(&state);

    let block = service.block_time(tenant_id, request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "block": block }))))
}

#[axum::debug_handler]
pub async fn delete_block(
    State(state): State<Arc<AppConfig>>,
    Path((tenant_id, block_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let service = SchedulingService::new(&state);

    service.remove_block(tenant_id, block_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// CALENDAR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_calendar_layout(
    State(state): State<Arc<AppConfig>>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);

    let day = service.calendar(tenant_id, query).await?;

    Ok(Json(json!(day)))
}
