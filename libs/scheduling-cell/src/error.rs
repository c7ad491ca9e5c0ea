use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{MinuteRange, ResolvedInterval};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    /// Nobody is qualified for the service at all. Operator-facing, not retryable.
    #[error("No provider configured for this service ({service_id})")]
    NoQualifiedProvider { service_id: Uuid },

    #[error("No provider is free at {time} on {date}")]
    NoAvailability { date: NaiveDate, time: String },

    /// The store rejected the insert because the slot was claimed after it was read.
    #[error("This time slot was just taken")]
    SlotTaken,

    #[error("Blocked time {requested} overlaps existing block {existing}")]
    OverlapRejected {
        requested: MinuteRange,
        existing: ResolvedInterval,
    },

    #[error("Malformed duration annotation: {0}")]
    MalformedDurationAnnotation(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),

    #[error("Provider not found: {0}")]
    ProviderNotFound(Uuid),

    #[error("Blocked time not found: {0}")]
    BlockNotFound(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl SchedulingError {
    /// Races are expected; callers refresh the slot list and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulingError::SlotTaken)
    }
}

impl From<SchedulingError> for AppError {
    fn from(error: SchedulingError) -> Self {
        let message = error.to_string();
        match error {
            SchedulingError::NoQualifiedProvider { .. } => AppError::Configuration(message),
            SchedulingError::NoAvailability { .. } => AppError::Conflict {
                code: "no_availability",
                message,
            },
            SchedulingError::SlotTaken => AppError::Conflict {
                code: "slot_taken",
                message,
            },
            SchedulingError::OverlapRejected { .. } => AppError::Conflict {
                code: "overlap_rejected",
                message,
            },
            SchedulingError::MalformedDurationAnnotation(_)
            | SchedulingError::InvalidTime(_)
            | SchedulingError::ValidationError(_) => AppError::ValidationError(message),
            SchedulingError::ServiceNotFound(_)
            | SchedulingError::ProviderNotFound(_)
            | SchedulingError::BlockNotFound(_) => AppError::NotFound(message),
            SchedulingError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
