use time::{
	Date, Month,
	macros::{date, datetime, time},
};

use daygrid_domain::{
	FastPathClassifier, IntentKind, ReminderTag, SlotRange, reminder, temporal,
};

#[test]
fn reminder_tokens_round_trip_across_the_calendar() {
	let mut day = date!(2023 - 12 - 30);
	let end = date!(2025 - 01 - 02);

	while day <= end {
		for (hour, minute) in [(0, 0), (9, 5), (12, 30), (23, 59)] {
			let token = ReminderTag::new(day, hour, minute).expect("tag must be valid").to_string();
			let parsed = ReminderTag::parse(&token).expect("token must parse");

			assert_eq!(parsed.to_string(), token);
			assert_eq!((parsed.date, parsed.hour, parsed.minute), (day, hour, minute));
		}

		let Some(next) = day.next_day() else {
			break;
		};

		day = next;
	}
}

#[test]
fn encoded_task_decodes_to_same_fields() {
	let leap = Date::from_calendar_date(2024, Month::February, 29).expect("leap day exists");
	let tag = ReminderTag::new(leap, 0, 0).expect("tag must be valid");
	let line = reminder::encode("book #2 review with Ana", &tag);
	let (decoded, rejected) = reminder::decode(&line);

	assert!(rejected.is_empty());
	assert_eq!(decoded.len(), 1);
	assert_eq!(decoded[0].task, "book #2 review with Ana");
	assert_eq!(decoded[0].tag, tag);
	assert_eq!(line, "book #2 review with Ana #29_Feb_2024_00_00");
}

#[test]
fn slot_floor_matches_half_hour_buckets() {
	for minute in 0..60_u16 {
		let slot = SlotRange::floor_at(16 * 60 + minute, 30);
		let expected = if minute >= 30 { 16 * 60 + 30 } else { 16 * 60 };

		assert_eq!(slot.start_minute(), expected);
		assert_eq!(slot.width(), 30);
	}
}

#[test]
fn bare_past_hour_defers_to_tomorrow_evening() {
	let now = datetime!(2024-01-15 21:00 UTC);
	let intent = FastPathClassifier::new(30).classify("swim at 7", now);
	let resolved = temporal::resolve(intent, now);

	assert!(resolved.deferred);

	let IntentKind::Reminder(reminder) = resolved.intent.kind else {
		panic!("Expected a reminder.");
	};

	assert_eq!(reminder.task, "swim");
	assert_eq!(reminder.target_date, date!(2024 - 01 - 16));
	assert_eq!(reminder.target_time, time!(19:00));
}

#[test]
fn explicit_morning_time_in_afternoon_defers() {
	let now = datetime!(2024-01-15 15:00 UTC);
	let intent = FastPathClassifier::new(30).classify("swim at 7 am", now);
	let resolved = temporal::resolve(intent, now);
	let IntentKind::Reminder(reminder) = resolved.intent.kind else {
		panic!("Expected a reminder.");
	};

	assert_eq!(reminder.target_time, time!(07:00));
	assert_eq!(reminder.target_date, date!(2024 - 01 - 16));
}

#[test]
fn inferred_slot_is_never_deferred() {
	let now = datetime!(2024-01-15 16:51 UTC);
	let intent = FastPathClassifier::new(30).classify("Meeting with team", now);
	let resolved = temporal::resolve(intent, now);

	assert!(!resolved.deferred);
	assert!(matches!(resolved.intent.kind, IntentKind::TimedActivity(_)));
}

#[test]
fn intent_serializes_with_readable_dates() {
	let now = datetime!(2024-01-15 09:00 UTC);
	let intent = FastPathClassifier::new(30).classify("remind me to call mom tomorrow", now);
	let json = serde_json::to_value(&intent).expect("intent must serialize");

	assert_eq!(json["kind"]["type"], "reminder");
	assert_eq!(json["kind"]["target_date"], "2024-01-16");
	assert_eq!(json["kind"]["target_time"], "09:00");
	assert_eq!(json["source"], "fast_path");
}
