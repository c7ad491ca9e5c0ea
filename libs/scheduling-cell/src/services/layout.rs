use chrono::NaiveDate;
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::models::{CalendarDay, CalendarEntry, LayoutBox, MinuteRange, ScheduleSnapshot, MINUTES_PER_DAY};
use crate::services::duration::DurationResolver;
use crate::services::time::weekday_index;

/// Place a day's appointments into side-by-side columns.
///
/// Overlapping entries are grouped into clusters; inside a cluster each entry
/// takes the lowest column whose previous occupant has ended. Vertical
/// position is a linear map onto `window`, with heights floored at
/// `min_height_percent`. Boxes come back in input order.
pub fn pack_day(entries: &[CalendarEntry], window: MinuteRange, min_height_percent: f64) -> Vec<LayoutBox> {
    let window = if window.start < window.end {
        window
    } else {
        MinuteRange::new(0, MINUTES_PER_DAY)
    };

    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        entries[a]
            .start_minute
            .cmp(&entries[b].start_minute)
            .then(entries[a].duration_minutes.cmp(&entries[b].duration_minutes))
            .then(a.cmp(&b))
    });

    let mut column_of = vec![0usize; entries.len()];
    let mut cluster_of = vec![0usize; entries.len()];
    let mut cluster_columns: Vec<usize> = Vec::new();

    let mut column_ends: Vec<u32> = Vec::new();
    let mut cluster_end = 0u32;

    for index in order {
        let span = packing_span(&entries[index]);

        if column_ends.is_empty() || span.start >= cluster_end {
            if !column_ends.is_empty() {
                cluster_columns.push(column_ends.len());
            }
            column_ends.clear();
            cluster_end = 0;
        }

        let column = match column_ends.iter().position(|end| *end <= span.start) {
            Some(column) => {
                column_ends[column] = span.end;
                column
            }
            None => {
                column_ends.push(span.end);
                column_ends.len() - 1
            }
        };

        cluster_end = cluster_end.max(span.end);
        column_of[index] = column;
        cluster_of[index] = cluster_columns.len();
    }
    if !column_ends.is_empty() {
        cluster_columns.push(column_ends.len());
    }

    let span_minutes = f64::from(window.duration());

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let columns = cluster_columns[cluster_of[index]];
            let column = column_of[index];
            let width_percent = 100.0 / columns as f64;

            let visible_start = entry.start_minute.clamp(window.start, window.end);
            let visible_end = entry
                .start_minute
                .saturating_add(entry.duration_minutes)
                .clamp(visible_start, window.end);

            let top_percent = f64::from(visible_start - window.start) / span_minutes * 100.0;
            let height_percent =
                (f64::from(visible_end - visible_start) / span_minutes * 100.0).max(min_height_percent);

            LayoutBox {
                booking_id: entry.booking_id,
                column,
                columns,
                top_percent,
                height_percent,
                left_percent: column as f64 * width_percent,
                width_percent,
                z_index: column as i32 + 1,
            }
        })
        .collect()
}

/// Zero-length entries still occupy a minute so their floored box does not
/// land on top of a neighbour.
fn packing_span(entry: &CalendarEntry) -> MinuteRange {
    MinuteRange::starting_at(entry.start_minute, entry.duration_minutes.max(1))
}

/// Layout of every active booking on `date`, optionally for one provider,
/// scaled to the practice hours (or the whole day when closed).
pub fn calendar_day(
    snapshot: &ScheduleSnapshot,
    config: &SchedulingConfig,
    date: NaiveDate,
    provider_id: Option<Uuid>,
) -> CalendarDay {
    let resolver = DurationResolver::new(config, &snapshot.services);

    let entries: Vec<CalendarEntry> = snapshot
        .bookings
        .iter()
        .filter(|booking| {
            booking.tenant_id == snapshot.tenant_id
                && booking.appointment_date == date
                && booking.is_active()
                && provider_id.is_none_or(|id| booking.provider_id == Some(id))
        })
        .map(|booking| CalendarEntry {
            booking_id: booking.id,
            start_minute: booking.start_minute(),
            duration_minutes: resolver.resolve(booking),
        })
        .collect();

    let window = snapshot
        .operating_hours_for(weekday_index(date))
        .filter(|hours| hours.enabled)
        .map(|hours| hours.range())
        .unwrap_or(MinuteRange::new(0, MINUTES_PER_DAY));

    CalendarDay {
        date,
        window,
        boxes: pack_day(&entries, window, config.min_layout_height_percent),
    }
}
