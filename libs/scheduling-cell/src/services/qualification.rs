use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{Provider, ScheduleSnapshot};

/// Active providers of the snapshot's tenant certified for `service_id`,
/// in ascending id order. An empty result means nobody can ever serve the request.
pub fn qualified_providers(snapshot: &ScheduleSnapshot, service_id: Uuid) -> Vec<&Provider> {
    let certified: HashSet<Uuid> = snapshot
        .qualifications
        .iter()
        .filter(|qualification| qualification.service_id == service_id)
        .map(|qualification| qualification.provider_id)
        .collect();

    let mut providers: Vec<&Provider> = snapshot
        .providers
        .iter()
        .filter(|provider| {
            provider.is_active
                && provider.tenant_id == snapshot.tenant_id
                && certified.contains(&provider.id)
        })
        .collect();

    providers.sort_by_key(|provider| provider.id);
    providers.dedup_by_key(|provider| provider.id);
    providers
}
