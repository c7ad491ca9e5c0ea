// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Patient-facing availability
        .route("/tenants/{tenant_id}/services/{service_id}/slots", get(handlers::get_available_slots))
        .route("/tenants/{tenant_id}/services/{service_id}/first-available", get(handlers::get_first_available_date))
        .route("/tenants/{tenant_id}/bookings", post(handlers::create_booking))

        // Practice-side blocked time and calendar
        .route("/tenants/{tenant_id}/blocks", post(handlers::create_block))
        .route("/tenants/{tenant_id}/blocks/{block_id}", delete(handlers::delete_block))
        .route("/tenants/{tenant_id}/calendar", get(handlers::get_calendar_layout))
        .with_state(state)
}
