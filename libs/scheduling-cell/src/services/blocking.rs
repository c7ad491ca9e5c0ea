use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::error::SchedulingError;
use crate::models::{
    BlockTimeRequest, BookingStatus, MinuteRange, NewBooking, ScheduleSnapshot, BLOCKED_TIME_TYPE,
};
use crate::services::busy::BusyIndex;
use crate::services::capacity::CapacityFilter;
use crate::services::duration::encode_block_notes;
use crate::services::time::{parse_time_of_day, time_of};

/// Reject `requested` when it overlaps any existing block of the provider.
/// Patient bookings are not considered here.
pub fn validate_block(busy: &BusyIndex, provider_id: Uuid, requested: &MinuteRange) -> Result<(), SchedulingError> {
    if requested.start >= requested.end {
        return Err(SchedulingError::ValidationError(
            "Block start must be before its end".to_string(),
        ));
    }

    match busy
        .blocks_for(provider_id)
        .find(|existing| existing.range().overlaps(requested))
    {
        Some(existing) => Err(SchedulingError::OverlapRejected {
            requested: *requested,
            existing: existing.clone(),
        }),
        None => Ok(()),
    }
}

/// Validate a block-time request against the snapshot and build the row to
/// insert. The length is stored structurally and also annotated in the notes.
pub fn prepare_block(
    snapshot: &ScheduleSnapshot,
    config: &SchedulingConfig,
    request: &BlockTimeRequest,
) -> Result<NewBooking, SchedulingError> {
    snapshot
        .provider(request.provider_id)
        .ok_or(SchedulingError::ProviderNotFound(request.provider_id))?;

    let requested = MinuteRange::new(
        parse_time_of_day(&request.start_time)?,
        parse_time_of_day(&request.end_time)?,
    );

    let busy = CapacityFilter::new(snapshot, config).busy_index(request.date);
    validate_block(&busy, request.provider_id, &requested)?;

    let start_time = time_of(requested.start)
        .ok_or_else(|| SchedulingError::InvalidTime(request.start_time.clone()))?;

    Ok(NewBooking {
        tenant_id: snapshot.tenant_id,
        provider_id: request.provider_id,
        service_id: None,
        patient_id: None,
        appointment_type: BLOCKED_TIME_TYPE.to_string(),
        appointment_date: request.date,
        start_time,
        duration_minutes: requested.duration(),
        status: BookingStatus::Blocked,
        notes: Some(encode_block_notes(
            requested.start,
            requested.duration(),
            request.reason.as_deref(),
        )),
    })
}
