use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{BookingStatus, MinuteRange, ResolvedInterval, ScheduleSnapshot};
use crate::services::duration::DurationResolver;

/// Occupied intervals per provider for a single date.
#[derive(Debug, Clone, Default)]
pub struct BusyIndex {
    by_provider: HashMap<Uuid, Vec<ResolvedInterval>>,
}

impl BusyIndex {
    /// Index every active (non-cancelled, not soft-deleted) booking of the
    /// snapshot's tenant on `date`, blocked time included. Bookings without a
    /// provider cannot occupy anyone and are skipped.
    pub fn build(snapshot: &ScheduleSnapshot, resolver: &DurationResolver<'_>, date: NaiveDate) -> Self {
        let mut by_provider: HashMap<Uuid, Vec<ResolvedInterval>> = HashMap::new();

        for booking in &snapshot.bookings {
            if booking.tenant_id != snapshot.tenant_id
                || booking.appointment_date != date
                || !booking.is_active()
            {
                continue;
            }
            let Some(provider_id) = booking.provider_id else {
                continue;
            };

            let start_minute = booking.start_minute();
            let status = if booking.is_blocked_time() {
                BookingStatus::Blocked
            } else {
                booking.status
            };

            by_provider.entry(provider_id).or_default().push(ResolvedInterval {
                provider_id,
                booking_id: booking.id,
                date,
                start_minute,
                end_minute: start_minute.saturating_add(resolver.resolve(booking)),
                status,
            });
        }

        for intervals in by_provider.values_mut() {
            intervals.sort_by_key(|interval| (interval.start_minute, interval.end_minute));
        }

        Self { by_provider }
    }

    pub fn intervals_for(&self, provider_id: Uuid) -> &[ResolvedInterval] {
        self.by_provider
            .get(&provider_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn blocks_for(&self, provider_id: Uuid) -> impl Iterator<Item = &ResolvedInterval> {
        self.intervals_for(provider_id)
            .iter()
            .filter(|interval| interval.status == BookingStatus::Blocked)
    }

    /// First existing interval of the provider that overlaps `range`.
    pub fn conflict(&self, provider_id: Uuid, range: &MinuteRange) -> Option<&ResolvedInterval> {
        self.intervals_for(provider_id)
            .iter()
            .find(|interval| interval.range().overlaps(range))
    }

    pub fn is_busy(&self, provider_id: Uuid, range: &MinuteRange) -> bool {
        self.conflict(provider_id, range).is_some()
    }

    /// Pairs of intervals of the same provider that overlap each other.
    pub fn overlapping_pairs(&self) -> Vec<(&ResolvedInterval, &ResolvedInterval)> {
        let mut pairs = Vec::new();
        for intervals in self.by_provider.values() {
            for (i, first) in intervals.iter().enumerate() {
                for second in &intervals[i + 1..] {
                    if second.start_minute >= first.end_minute {
                        break;
                    }
                    if first.range().overlaps(&second.range()) {
                        pairs.push((first, second));
                    }
                }
            }
        }
        pairs
    }
}
