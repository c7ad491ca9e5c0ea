use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use shared_config::AssignmentStrategy;

use crate::error::SchedulingError;
use crate::models::{MinuteRange, Provider, ProviderAssignment};
use crate::services::capacity::DayRoster;
use crate::services::time::format_minutes;

/// Bind one qualified, working, free provider to `interval`.
///
/// The candidates are recomputed here rather than trusted from an earlier
/// slot listing. `FirstAvailable` takes the lowest id; `LeastLoaded` takes the
/// provider with the fewest bookings in `load`, lowest id on ties. An empty
/// candidate set is a hard failure: the booking must be aborted.
pub fn select_provider(
    roster: &DayRoster<'_>,
    interval: &MinuteRange,
    strategy: AssignmentStrategy,
    load: &HashMap<Uuid, u32>,
) -> Result<ProviderAssignment, SchedulingError> {
    if roster.providers.is_empty() {
        return Err(SchedulingError::NoQualifiedProvider {
            service_id: roster.service.id,
        });
    }

    let free = roster.free_providers(interval);

    let chosen: Option<&Provider> = match strategy {
        AssignmentStrategy::FirstAvailable => free.first().copied(),
        AssignmentStrategy::LeastLoaded => free
            .iter()
            .copied()
            .min_by_key(|provider| (load.get(&provider.id).copied().unwrap_or(0), provider.id)),
    };

    let provider = chosen.ok_or_else(|| SchedulingError::NoAvailability {
        date: roster.date,
        time: format_minutes(interval.start),
    })?;

    debug!(
        "Assigned provider {} to {} on {} ({} free candidates)",
        provider.id,
        interval,
        roster.date,
        free.len()
    );

    Ok(ProviderAssignment {
        provider_id: provider.id,
        provider_name: provider.name.clone(),
    })
}
