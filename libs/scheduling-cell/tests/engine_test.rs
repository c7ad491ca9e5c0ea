mod common;

use assert_matches::assert_matches;
use chrono::Days;
use uuid::Uuid;

use scheduling_cell::models::{BlockTimeRequest, BookingRequest, CalendarEntry, MinuteRange};
use scheduling_cell::services::assignment::select_provider;
use scheduling_cell::services::blocking::prepare_block;
use scheduling_cell::services::booking::plan_booking;
use scheduling_cell::services::layout::{calendar_day, pack_day};
use scheduling_cell::services::search::first_available_date;
use scheduling_cell::services::time::parse_time_of_day;
use scheduling_cell::services::CapacityFilter;
use scheduling_cell::SchedulingError;
use shared_config::{AssignmentStrategy, SchedulingConfig};

use common::*;

fn single_provider_practice() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .service(consult(), "Consultation", 30)
        .provider(provider_a(), "Dr. Avery", &[consult()])
        .window(provider_a(), MONDAY, "09:00", "17:00")
        .hours(MONDAY, 8, 18)
}

#[test]
fn test_free_provider_makes_slot_available() {
    let snapshot = single_provider_practice().build();
    let config = SchedulingConfig::default();
    let start = parse_time_of_day("10:00 AM").unwrap();

    let slot = CapacityFilter::new(&snapshot, &config)
        .slot_at(consult(), monday(), start)
        .unwrap();

    assert!(slot.is_available);
    assert_eq!(slot.qualified_capacity, 1);
    assert_eq!(slot.used_capacity, 0);
    assert_eq!(slot.time, "10:00");
    assert_eq!(slot.display_time, "10:00 AM");
}

#[test]
fn test_partially_overlapping_booking_uses_capacity() {
    let snapshot = single_provider_practice()
        .booking(booking(provider_a(), monday(), "10:00", 30))
        .build();
    let config = SchedulingConfig::default();

    let slot = CapacityFilter::new(&snapshot, &config)
        .slot_at(consult(), monday(), parse_time_of_day("10:15").unwrap())
        .unwrap();

    assert!(!slot.is_available);
    assert_eq!(slot.qualified_capacity, 1);
    assert_eq!(slot.used_capacity, 1);

    // back-to-back is fine
    let after = CapacityFilter::new(&snapshot, &config)
        .slot_at(consult(), monday(), parse_time_of_day("10:30").unwrap())
        .unwrap();
    assert!(after.is_available);
}

#[test]
fn test_gap_between_split_shifts_has_no_capacity() {
    let snapshot = SnapshotBuilder::new()
        .service(consult(), "Consultation", 30)
        .provider(provider_a(), "Dr. Avery", &[consult()])
        .provider(provider_b(), "Dr. Blake", &[consult()])
        .window(provider_a(), MONDAY, "09:00", "12:00")
        .window(provider_b(), MONDAY, "13:00", "17:00")
        .hours(MONDAY, 8, 18)
        .build();
    let config = SchedulingConfig::default();
    let filter = CapacityFilter::new(&snapshot, &config);

    let slot = filter.slot_at(consult(), monday(), parse_time_of_day("12:30").unwrap()).unwrap();
    assert!(!slot.is_available);
    assert_eq!(slot.qualified_capacity, 0);
    assert_eq!(slot.used_capacity, 0);

    // 11:45 would run past the end of the morning shift
    let straddling = filter.slot_at(consult(), monday(), parse_time_of_day("11:45").unwrap()).unwrap();
    assert_eq!(straddling.qualified_capacity, 0);
}

#[test]
fn test_block_overlapping_existing_block_is_rejected() {
    let snapshot = single_provider_practice()
        .booking(block(provider_a(), monday(), "12:30", 60))
        .build();
    let config = SchedulingConfig::default();

    let request = BlockTimeRequest {
        provider_id: provider_a(),
        date: monday(),
        start_time: "12:00".to_string(),
        end_time: "13:00".to_string(),
        reason: Some("Lunch".to_string()),
    };

    let result = prepare_block(&snapshot, &config, &request);

    assert_matches!(result, Err(SchedulingError::OverlapRejected { requested, existing }) => {
        assert_eq!(requested, MinuteRange::new(720, 780));
        assert_eq!(existing.range(), MinuteRange::new(750, 810));
    });
}

#[test]
fn test_block_next_to_existing_block_is_encoded() {
    let snapshot = single_provider_practice()
        .booking(block(provider_a(), monday(), "12:30", 60))
        // patient bookings do not stop a block
        .booking(booking(provider_a(), monday(), "14:00", 30))
        .build();
    let config = SchedulingConfig::default();

    let request = BlockTimeRequest {
        provider_id: provider_a(),
        date: monday(),
        start_time: "1:30 PM".to_string(),
        end_time: "14:30".to_string(),
        reason: Some("Staff meeting".to_string()),
    };

    let row = prepare_block(&snapshot, &config, &request).unwrap();

    assert_eq!(row.duration_minutes, 60);
    assert_eq!(row.start_time, hhmm("13:30"));
    assert_eq!(row.patient_id, None);
    assert_eq!(row.appointment_type, "Blocked Time");
    assert_eq!(
        row.notes.as_deref(),
        Some("DURATION:60 END_TIME:14:30 | Staff meeting")
    );
}

#[test]
fn test_inverted_block_is_a_validation_error() {
    let snapshot = single_provider_practice().build();
    let request = BlockTimeRequest {
        provider_id: provider_a(),
        date: monday(),
        start_time: "15:00".to_string(),
        end_time: "14:00".to_string(),
        reason: None,
    };

    assert_matches!(
        prepare_block(&snapshot, &SchedulingConfig::default(), &request),
        Err(SchedulingError::ValidationError(_))
    );
}

#[test]
fn test_fully_booked_horizon_falls_back_to_today() {
    let config = SchedulingConfig::default();
    let today = monday();
    let now = today.and_hms_opt(7, 0, 0).unwrap();

    let mut builder = SnapshotBuilder::new()
        .service(consult(), "Consultation", 30)
        .provider(provider_a(), "Dr. Avery", &[consult()])
        .every_day(provider_a(), "09:00", "17:00")
        .open_every_day(9, 17);
    for offset in 0..u64::from(config.search_horizon_days) {
        let day = today.checked_add_days(Days::new(offset)).unwrap();
        builder = builder.booking(block(provider_a(), day, "09:00", 480));
    }
    let snapshot = builder.build();

    let result = first_available_date(&snapshot, &config, consult(), now).unwrap();

    assert!(!result.found);
    assert_eq!(result.date, today);
    assert!(result.slots.iter().all(|slot| !slot.is_available));
}

#[test]
fn test_first_available_date_skips_booked_and_closed_days() {
    let config = SchedulingConfig::default();
    let today = monday();
    let now = today.and_hms_opt(7, 0, 0).unwrap();
    let tuesday = today.succ_opt().unwrap();

    // Open Monday and Wednesday only; Monday is fully blocked.
    let snapshot = SnapshotBuilder::new()
        .service(consult(), "Consultation", 30)
        .provider(provider_a(), "Dr. Avery", &[consult()])
        .every_day(provider_a(), "09:00", "17:00")
        .hours(MONDAY, 9, 17)
        .hours(3, 9, 17)
        .booking(block(provider_a(), today, "09:00", 480))
        .build();

    let result = first_available_date(&snapshot, &config, consult(), now).unwrap();

    assert!(result.found);
    assert_eq!(result.date, tuesday.succ_opt().unwrap());
    assert_eq!(result.slots.first().map(|slot| slot.time.as_str()), Some("09:00"));
}

#[test]
fn test_used_capacity_never_exceeds_qualified() {
    let snapshot = two_provider_practice()
        .booking(booking(provider_a(), monday(), "09:00", 45))
        .booking(booking(provider_b(), monday(), "09:20", 30))
        .booking(block(provider_a(), monday(), "12:00", 90))
        .booking(booking(provider_b(), monday(), "12:10", 60))
        .booking(booking(provider_b(), monday(), "16:30", 30))
        .build();
    let config = SchedulingConfig::default();

    let slots = CapacityFilter::new(&snapshot, &config)
        .day_slots(massage(), monday(), sunday_evening())
        .unwrap();

    assert_eq!(slots.len(), 60);
    for slot in &slots {
        assert!(slot.used_capacity <= slot.qualified_capacity, "{:?}", slot);
        if slot.is_available {
            assert!(slot.used_capacity < slot.qualified_capacity);
        }
    }
}

#[test]
fn test_slot_listing_is_idempotent() {
    let snapshot = two_provider_practice()
        .booking(booking(provider_a(), monday(), "10:00", 30))
        .booking(block(provider_b(), monday(), "10:00", 120))
        .build();
    let config = SchedulingConfig::default();
    let filter = CapacityFilter::new(&snapshot, &config);

    let first = filter.day_slots(consult(), monday(), sunday_evening()).unwrap();
    let second = filter.day_slots(consult(), monday(), sunday_evening()).unwrap();

    assert_eq!(first, second);

    let ten = first.iter().find(|slot| slot.time == "10:00").unwrap();
    assert!(!ten.is_available);
    assert_eq!((ten.qualified_capacity, ten.used_capacity), (2, 2));
}

#[test]
fn test_slot_must_end_by_closing_time() {
    let snapshot = SnapshotBuilder::new()
        .service(massage(), "Massage", 60)
        .provider(provider_a(), "Dr. Avery", &[massage()])
        .window(provider_a(), MONDAY, "08:00", "20:00")
        .hours(MONDAY, 9, 17)
        .build();
    let config = SchedulingConfig::default();

    let slots = CapacityFilter::new(&snapshot, &config)
        .day_slots(massage(), monday(), sunday_evening())
        .unwrap();

    let last_bookable = slots.iter().filter(|slot| slot.is_available).last().unwrap();
    assert_eq!(last_bookable.time, "16:00");
    assert!(slots.iter().any(|slot| slot.time == "16:10" && !slot.is_available));
}

#[test]
fn test_service_without_qualified_provider_is_configuration_error() {
    let orphan = Uuid::from_u128(0x5e99);
    let snapshot = two_provider_practice().service(orphan, "Acupuncture", 45).build();
    let config = SchedulingConfig::default();

    assert_matches!(
        CapacityFilter::new(&snapshot, &config).day_slots(orphan, monday(), sunday_evening()),
        Err(SchedulingError::NoQualifiedProvider { service_id }) if service_id == orphan
    );
    assert_matches!(
        first_available_date(&snapshot, &config, orphan, sunday_evening()),
        Err(SchedulingError::NoQualifiedProvider { .. })
    );
}

#[test]
fn test_day_off_removes_provider_capacity() {
    let snapshot = two_provider_practice().day_off(provider_a(), monday()).build();
    let config = SchedulingConfig::default();

    let slot = CapacityFilter::new(&snapshot, &config)
        .slot_at(consult(), monday(), 600)
        .unwrap();
    assert_eq!(slot.qualified_capacity, 1);

    let request = BookingRequest {
        service_id: consult(),
        date: monday(),
        time: "10:00".to_string(),
        patient_id: None,
        notes: None,
    };
    let (_, assignment) = plan_booking(&snapshot, &config, &request, sunday_evening()).unwrap();
    assert_eq!(assignment.provider_id, provider_b());
}

#[test]
fn test_first_available_assignment_takes_lowest_id() {
    let snapshot = two_provider_practice().build();
    let config = SchedulingConfig::default();
    let filter = CapacityFilter::new(&snapshot, &config);
    let roster = filter.roster(consult(), monday()).unwrap();

    let assignment = select_provider(
        &roster,
        &MinuteRange::starting_at(600, 30),
        AssignmentStrategy::FirstAvailable,
        &snapshot.provider_load,
    )
    .unwrap();

    assert_eq!(assignment.provider_id, provider_a());
    assert_eq!(assignment.provider_name, "Dr. Avery");
}

#[test]
fn test_least_loaded_assignment_prefers_idle_provider() {
    let snapshot = two_provider_practice()
        .booking(booking(provider_a(), monday(), "09:00", 30))
        .booking(booking(provider_a(), monday(), "14:00", 30))
        .booking(booking(provider_b(), monday(), "15:00", 30))
        // blocks do not count as load
        .booking(block(provider_b(), monday(), "16:00", 30))
        .build();
    let config = SchedulingConfig {
        assignment_strategy: AssignmentStrategy::LeastLoaded,
        ..SchedulingConfig::default()
    };

    let request = BookingRequest {
        service_id: consult(),
        date: monday(),
        time: "11:00".to_string(),
        patient_id: Some(Uuid::new_v4()),
        notes: None,
    };
    let (row, assignment) = plan_booking(&snapshot, &config, &request, sunday_evening()).unwrap();

    assert_eq!(snapshot.provider_load.get(&provider_b()), Some(&1));
    assert_eq!(assignment.provider_id, provider_b());
    assert_eq!(row.provider_id, provider_b());
    assert_eq!(row.duration_minutes, 30);
}

#[test]
fn test_plan_booking_rejects_full_and_elapsed_slots() {
    let snapshot = two_provider_practice()
        .booking(booking(provider_a(), monday(), "10:00", 30))
        .booking(booking(provider_b(), monday(), "10:00", 30))
        .build();
    let config = SchedulingConfig::default();

    let full = BookingRequest {
        service_id: consult(),
        date: monday(),
        time: "10:10".to_string(),
        patient_id: None,
        notes: None,
    };
    assert_matches!(
        plan_booking(&snapshot, &config, &full, sunday_evening()),
        Err(SchedulingError::NoAvailability { time, .. }) if time == "10:10"
    );

    let elapsed = BookingRequest {
        time: "09:00".to_string(),
        ..full
    };
    let noon = monday().and_hms_opt(12, 0, 0).unwrap();
    assert_matches!(
        plan_booking(&snapshot, &config, &elapsed, noon),
        Err(SchedulingError::ValidationError(_))
    );
}

#[test]
fn test_legacy_annotations_occupy_their_encoded_length() {
    let mut legacy_block = block(provider_a(), monday(), "12:00", 0);
    legacy_block.duration_minutes = None;
    legacy_block.notes = Some("Dentist appointment DURATION:90".to_string());

    let mut legacy_visit = booking(provider_b(), monday(), "12:00", 0);
    legacy_visit.duration_minutes = None;
    legacy_visit.notes = Some("follow-up, END_TIME:12:45".to_string());

    let snapshot = two_provider_practice()
        .booking(legacy_block)
        .booking(legacy_visit)
        .build();
    let config = SchedulingConfig::default();
    let filter = CapacityFilter::new(&snapshot, &config);

    let at_1300 = filter.slot_at(consult(), monday(), 780).unwrap();
    assert_eq!(at_1300.used_capacity, 1);

    let at_1330 = filter.slot_at(consult(), monday(), 810).unwrap();
    assert_eq!(at_1330.used_capacity, 0);
}

#[test]
fn test_non_overlapping_day_packs_into_one_column() {
    let entries: Vec<CalendarEntry> = [(540, 30), (570, 60), (700, 15), (900, 0)]
        .into_iter()
        .map(|(start_minute, duration_minutes)| CalendarEntry {
            booking_id: Uuid::new_v4(),
            start_minute,
            duration_minutes,
        })
        .collect();

    let boxes = pack_day(&entries, MinuteRange::new(480, 1080), 2.0);

    assert_eq!(boxes.len(), entries.len());
    for layout in &boxes {
        assert_eq!(layout.column, 0);
        assert_eq!(layout.width_percent, 100.0);
        assert_eq!(layout.left_percent, 0.0);
        assert!(layout.height_percent >= 2.0);
    }
}

#[test]
fn test_calendar_day_columns_overlapping_bookings() {
    let first = booking(provider_a(), monday(), "10:00", 60);
    let second = booking(provider_b(), monday(), "10:30", 30);
    let later = booking(provider_a(), monday(), "13:00", 30);
    let mut removed = block(provider_a(), monday(), "10:00", 60);
    removed.deleted_at = Some(chrono::Utc::now());

    let snapshot = two_provider_practice()
        .booking(first.clone())
        .booking(second.clone())
        .booking(later.clone())
        .booking(removed)
        .build();
    let config = SchedulingConfig::default();

    let day = calendar_day(&snapshot, &config, monday(), None);
    assert_eq!(day.window, MinuteRange::new(480, 1080));
    assert_eq!(day.boxes.len(), 3);

    let by_id = |id: Uuid| day.boxes.iter().find(|b| b.booking_id == id).unwrap();
    assert_eq!((by_id(first.id).column, by_id(first.id).columns), (0, 2));
    assert_eq!((by_id(second.id).column, by_id(second.id).columns), (1, 2));
    assert_eq!(by_id(second.id).left_percent, 50.0);
    assert_eq!(by_id(later.id).width_percent, 100.0);

    let only_b = calendar_day(&snapshot, &config, monday(), Some(provider_b()));
    assert_eq!(only_b.boxes.len(), 1);
    assert_eq!(only_b.boxes[0].width_percent, 100.0);
}

#[test]
fn test_oversized_legacy_duration_occupies_rest_of_day() {
    let mut runaway = block(provider_a(), monday(), "09:00", 0);
    runaway.duration_minutes = None;
    runaway.notes = Some("away DURATION:4294967295".to_string());
    let runaway_id = runaway.id;

    let snapshot = two_provider_practice().booking(runaway).build();
    let config = SchedulingConfig::default();
    let filter = CapacityFilter::new(&snapshot, &config);

    let busy = filter.busy_index(monday());
    let interval = &busy.intervals_for(provider_a())[0];
    assert_eq!(interval.range(), MinuteRange::new(540, 1440));

    let slots = filter.day_slots(consult(), monday(), sunday_evening()).unwrap();
    let at = |time: &str| slots.iter().find(|slot| slot.time == time).unwrap();
    assert_eq!(at("09:00").used_capacity, 1);
    assert_eq!(at("16:30").used_capacity, 1);
    assert!(at("16:30").is_available);

    let day = calendar_day(&snapshot, &config, monday(), None);
    let layout = day.boxes.iter().find(|b| b.booking_id == runaway_id).unwrap();
    assert!((layout.top_percent - 10.0).abs() < 1e-9);
    assert!((layout.height_percent - 90.0).abs() < 1e-9);
}

#[test]
fn test_oversized_service_duration_is_never_available() {
    let endless = Uuid::from_u128(0x5e77);
    let snapshot = two_provider_practice()
        .service(endless, "Retreat", u32::MAX)
        .provider(Uuid::from_u128(0xc3), "Dr. Cole", &[endless])
        .every_day(Uuid::from_u128(0xc3), "00:00", "17:00")
        .build();
    let config = SchedulingConfig::default();

    let slots = CapacityFilter::new(&snapshot, &config)
        .day_slots(endless, monday(), sunday_evening())
        .unwrap();

    assert_eq!(slots.len(), 60);
    assert!(slots.iter().all(|slot| !slot.is_available && slot.qualified_capacity == 0));
}
