use std::{sync::Arc, time::Duration};

use time::{OffsetDateTime, macros::{date, datetime}};

use daygrid_document::{
	DocumentId,
	memory::{Block, MemoryIndex, MemoryStore},
};
use daygrid_domain::{ActionKind, IntentKind, Source};
use daygrid_service::{DaygridService, Placement, RoutePath, VoiceEntry};
use daygrid_testkit::{
	FixedClock, RejectingStore, Reply, ScriptedExtractor, cell_text, doc_id, half_hour_rows,
	paragraphs, planner, planner_with_labels, row_labels, test_config,
};

fn full_planner() -> Arc<MemoryStore> {
	let rows = planner_with_labels(&half_hour_rows(6, 23));

	Arc::new(MemoryStore::new().with_document(doc_id(), rows))
}

fn service(
	store: Arc<dyn daygrid_document::DocumentStore>,
	extractor: &Arc<ScriptedExtractor>,
	now: OffsetDateTime,
) -> DaygridService {
	DaygridService::new(test_config(), store, extractor.clone(), Arc::new(FixedClock::new(now)))
}

fn blocks(store: &MemoryStore) -> Vec<Block> {
	store.blocks(&doc_id()).expect("Document must exist.")
}

#[tokio::test]
async fn confident_fast_path_never_calls_backend() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 10:30 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("Meeting with team", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(recorded.routed.path, RoutePath::FastPath);
	assert!((recorded.routed.intent.confidence - 0.9).abs() < f32::EPSILON);
	assert_eq!(
		recorded.writes[0].placement,
		Placement::ExistingRow { row: 10, label: "10:30 AM – 11:00 AM".to_string() }
	);
	assert_eq!(
		cell_text(&blocks(&store), "10:30 AM – 11:00 AM").as_deref(),
		Some("Meeting with team")
	);
	assert_eq!(extractor.extract_calls(), 0);
	assert_eq!(extractor.probe_calls(), 0);
}

#[tokio::test]
async fn complete_fast_reminder_skips_backend() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 09:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("remind me to call mom tomorrow", now))
		.await
		.expect("Record must succeed.");
	let IntentKind::Reminder(reminder) = &recorded.routed.intent.kind else {
		panic!("Expected a reminder.");
	};

	assert_eq!(reminder.task, "call mom");
	assert_eq!(reminder.target_date, date!(2024 - 01 - 16));
	assert_eq!(recorded.writes[0].action, ActionKind::ToDo);
	assert_eq!(extractor.extract_calls(), 0);
	assert!(paragraphs(&blocks(&store)).contains(&"call mom #16_Jan_2024_09_00".to_string()));
}

#[tokio::test]
async fn backend_reminder_for_tomorrow_morning() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([ScriptedExtractor::content(
		"Here you go: {\"isReminder\": true, \"task\": \"swim\", \"targetDate\": \"2024-01-16\", \"targetTime\": \"07:00\"}",
	)]));
	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("swim at 7", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(recorded.routed.path, RoutePath::Extraction);
	assert_eq!(recorded.routed.intent.source, Source::Extraction);
	assert_eq!(extractor.extract_calls(), 1);
	assert!(paragraphs(&blocks(&store)).contains(&"swim #16_Jan_2024_07_00".to_string()));

	let prompt = extractor.last_messages();

	assert!(prompt[1]["content"].as_str().is_some_and(|content| content.contains("swim at 7")));
}

#[tokio::test]
async fn backend_slot_lands_in_grid() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([Reply::Json(serde_json::json!({
		"isReminder": false,
		"timeSlot": "7:00 PM – 7:30 PM",
		"actions": ["timeSlot"]
	}))]));
	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("swim at 7", now))
		.await
		.expect("Record must succeed.");

	assert!(!recorded.routed.deferred);
	assert_eq!(cell_text(&blocks(&store), "7:00 PM – 7:30 PM").as_deref(), Some("swim at 7"));
}

#[tokio::test]
async fn slow_backend_falls_back_to_fast_path() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([Reply::Slow(
		Duration::from_secs(2),
		serde_json::json!({ "timeSlot": "7:00 AM – 7:30 AM" }),
	)]));
	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("swim at 7", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(recorded.routed.path, RoutePath::Fallback);
	assert_eq!(recorded.routed.intent.source, Source::FastPath);
	assert_eq!(extractor.extract_calls(), 1);
	assert_eq!(cell_text(&blocks(&store), "7:00 PM – 7:30 PM").as_deref(), Some("swim at 7"));
}

#[tokio::test]
async fn garbage_backend_output_falls_back() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([ScriptedExtractor::content(
		"Sorry, I cannot help with that.",
	)]));
	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store, &extractor, now);
	let routed = service.route(&VoiceEntry::new("swim at 7", now)).await;

	assert_eq!(routed.path, RoutePath::Fallback);
	assert!((routed.intent.confidence - 0.7).abs() < f32::EPSILON);
}

#[tokio::test]
async fn unusable_reminder_falls_back() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([Reply::Json(serde_json::json!({
		"isReminder": true,
		"task": "renew passport",
		"targetDate": "next month-ish"
	}))]));
	let now = datetime!(2024-01-15 09:00 UTC);
	let service = service(store, &extractor, now);
	let routed = service.route(&VoiceEntry::new("set a reminder to renew passport", now)).await;

	assert_eq!(routed.path, RoutePath::Fallback);
	assert!(matches!(routed.intent.kind, IntentKind::Note(_)));
}

#[tokio::test]
async fn down_backend_is_probed_once_per_window() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::unused());

	extractor.set_backend_up(false);

	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store, &extractor, now);

	for _ in 0..2 {
		let routed = service.route(&VoiceEntry::new("swim at 7", now)).await;

		assert_eq!(routed.path, RoutePath::Fallback);
	}

	assert_eq!(extractor.probe_calls(), 1);
	assert_eq!(extractor.extract_calls(), 0);
}

#[tokio::test]
async fn explicit_past_time_becomes_tomorrow_reminder() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("gym at 7 am", now))
		.await
		.expect("Record must succeed.");

	assert!(recorded.routed.deferred);
	assert_eq!(recorded.writes[0].action, ActionKind::ToDo);
	assert!(paragraphs(&blocks(&store)).contains(&"gym #16_Jan_2024_07_00".to_string()));
	assert_eq!(cell_text(&blocks(&store), "7:00 AM – 7:30 AM").as_deref(), Some(""));
}

#[tokio::test]
async fn retrospective_entry_stays_today() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([Reply::Json(serde_json::json!({
		"timeSlot": "9:00 AM – 9:30 AM",
		"isRetrospective": true
	}))]));
	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("finished painting the fence at 9", now))
		.await
		.expect("Record must succeed.");

	assert!(!recorded.routed.deferred);
	assert_eq!(
		cell_text(&blocks(&store), "9:00 AM – 9:30 AM").as_deref(),
		Some("finished painting the fence at 9")
	);
}

#[tokio::test]
async fn overlapping_rows_pick_the_narrowest() {
	let store = Arc::new(
		MemoryStore::new()
			.with_document(doc_id(), planner(&[("12:00–2:00 PM", ""), ("1:00–1:30 PM", "")])),
	);
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 12:00 UTC);
	let service = service(store.clone(), &extractor, now);

	service
		.record(&doc_id(), &VoiceEntry::new("meeting at 1:10 pm", now))
		.await
		.expect("Record must succeed.");

	let blocks = blocks(&store);

	assert_eq!(cell_text(&blocks, "1:00–1:30 PM").as_deref(), Some("meeting at 1:10 pm"));
	assert_eq!(cell_text(&blocks, "12:00–2:00 PM").as_deref(), Some(""));
}

#[tokio::test]
async fn existing_cell_text_is_kept() {
	let rows = planner(&[("10:30 AM – 11:00 AM", "standup")]);
	let store = Arc::new(MemoryStore::new().with_document(doc_id(), rows));
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 10:40 UTC);
	let service = service(store.clone(), &extractor, now);

	service
		.record(&doc_id(), &VoiceEntry::new("Meeting with team", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(
		cell_text(&blocks(&store), "10:30 AM – 11:00 AM").as_deref(),
		Some("standup\nMeeting with team")
	);
}

#[tokio::test]
async fn missing_row_is_created_in_order() {
	let store = Arc::new(MemoryStore::new().with_document(
		doc_id(),
		planner(&[("9:00 AM – 9:30 AM", ""), ("11:00 AM – 11:30 AM", "")]),
	));
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 08:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("meeting at 10 am", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(
		recorded.writes[0].placement,
		Placement::CreatedRow { row: 2, label: "10:00 AM – 10:30 AM".to_string() }
	);

	let blocks = blocks(&store);

	assert_eq!(
		row_labels(&blocks),
		vec!["Time", "9:00 AM – 9:30 AM", "10:00 AM – 10:30 AM", "11:00 AM – 11:30 AM"]
	);
	assert_eq!(cell_text(&blocks, "10:00 AM – 10:30 AM").as_deref(), Some("meeting at 10 am"));
}

#[tokio::test]
async fn rejected_row_creation_appends() {
	let inner = MemoryStore::new().with_document(doc_id(), planner(&[("9:00 AM – 9:30 AM", "")]));
	let store = Arc::new(RejectingStore::structural(inner));
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 08:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("meeting at 10 am", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(recorded.writes[0].placement, Placement::Appended);
	assert_eq!(
		paragraphs(&blocks(store.inner())).last().map(String::as_str),
		Some("meeting at 10 am")
	);
	assert_eq!(row_labels(&blocks(store.inner())).len(), 2);
}

#[tokio::test]
async fn no_tables_and_no_matching_paragraph_appends() {
	let store = Arc::new(
		MemoryStore::new()
			.with_document(doc_id(), vec![Block::Paragraph("Thoughts for today".to_string())]),
	);
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 10:30 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("Meeting with team", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(recorded.writes[0].placement, Placement::Appended);
	assert_eq!(
		paragraphs(&blocks(&store)),
		vec!["Thoughts for today".to_string(), "Meeting with team".to_string()]
	);
}

#[tokio::test]
async fn paragraph_naming_the_slot_is_used_without_a_grid() {
	let store = Arc::new(MemoryStore::new().with_document(
		doc_id(),
		vec![
			Block::Paragraph("10:30 AM".to_string()),
			Block::Paragraph("Lunch plans".to_string()),
		],
	));
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 10:30 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("Meeting with team", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(
		recorded.writes[0].placement,
		Placement::Paragraph { after: "10:30 AM".to_string() }
	);
	assert_eq!(
		paragraphs(&blocks(&store)),
		vec!["10:30 AM".to_string(), "Meeting with team".to_string(), "Lunch plans".to_string()]
	);
}

#[tokio::test]
async fn journal_entry_goes_under_its_heading() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([Reply::Json(serde_json::json!({
		"journalEntry": "Felt grateful after talking to Ana.",
		"sentiment": "positive",
		"inferredHashtags": ["gratitude"],
		"mentionedPersons": ["Ana"],
		"actions": ["journal"]
	}))]));
	let now = datetime!(2024-01-15 21:00 UTC);
	let service = service(store.clone(), &extractor, now);

	service
		.record(&doc_id(), &VoiceEntry::new("felt grateful after talking to ana", now))
		.await
		.expect("Record must succeed.");

	let paragraphs = paragraphs(&blocks(&store));
	let heading = paragraphs.iter().position(|text| text == "Journal").expect("Journal heading.");

	assert_eq!(paragraphs[heading + 1], "Felt grateful after talking to Ana. #gratitude (with Ana)");
}

#[tokio::test]
async fn store_refusing_everything_surfaces_an_error() {
	let inner = MemoryStore::new().with_document(doc_id(), planner(&[("9:00 AM – 9:30 AM", "")]));
	let store = Arc::new(RejectingStore::all(inner));
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 09:00 UTC);
	let service = service(store, &extractor, now);
	let result = service.record(&doc_id(), &VoiceEntry::new("Meeting with team", now)).await;

	assert!(result.is_err());
}

#[tokio::test]
async fn carry_forward_places_due_reminders_once() {
	let yesterday = DocumentId::new("2024-01-14");
	let before = DocumentId::new("2024-01-13");
	let store = Arc::new(
		MemoryStore::new()
			.with_document(doc_id(), planner_with_labels(&half_hour_rows(6, 23)))
			.with_document(
				yesterday.clone(),
				vec![
					Block::Paragraph("To-Do".to_string()),
					Block::Paragraph("call mom #15_Jan_2024_09_00".to_string()),
					Block::Paragraph("broken #99_Foo_2024_00_00".to_string()),
					Block::Paragraph("later #20_Jan_2024_10_00".to_string()),
				],
			)
			.with_document(
				before.clone(),
				vec![Block::Paragraph("- call mom #15_Jan_2024_09_00".to_string())],
			),
	);
	let index = MemoryIndex::new()
		.with_day(date!(2024 - 01 - 14), yesterday)
		.with_day(date!(2024 - 01 - 13), before)
		.with_day(date!(2024 - 01 - 15), doc_id());
	let extractor = Arc::new(ScriptedExtractor::unused());
	let service = service(store.clone(), &extractor, datetime!(2024-01-15 06:00 UTC));
	let report = service
		.carry_forward_reminders(&index, &doc_id(), date!(2024 - 01 - 15))
		.await
		.expect("Carry-forward must succeed.");

	assert_eq!(report.placed.len(), 1);
	assert_eq!(report.scanned_days, 2);
	assert_eq!(report.duplicates, 1);
	assert_eq!(report.skipped_tokens, 1);
	assert_eq!(
		cell_text(&blocks(&store), "9:00 AM – 9:30 AM").as_deref(),
		Some("call mom #15_Jan_2024_09_00")
	);

	let again = service
		.carry_forward_reminders(&index, &doc_id(), date!(2024 - 01 - 15))
		.await
		.expect("Carry-forward must succeed.");

	assert!(again.placed.is_empty());
	assert_eq!(again.already_present, 1);
}

#[tokio::test]
async fn time_minutes_ahead_stays_in_todays_row() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 15:05 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("meeting at 3:10 pm", now))
		.await
		.expect("Record must succeed.");

	assert!(!recorded.routed.deferred);
	assert_eq!(recorded.writes[0].action, ActionKind::TimeSlot);
	assert_eq!(
		cell_text(&blocks(&store), "3:00 PM – 3:30 PM").as_deref(),
		Some("meeting at 3:10 pm")
	);
}

#[tokio::test]
async fn deferred_reminder_keeps_the_spoken_minute() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::unused());
	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("gym at 7:45 am", now))
		.await
		.expect("Record must succeed.");

	assert!(recorded.routed.deferred);
	assert!(paragraphs(&blocks(&store)).contains(&"gym #16_Jan_2024_07_45".to_string()));
}

#[tokio::test]
async fn passed_backend_slot_is_deferred() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([Reply::Json(serde_json::json!({
		"timeSlot": "7:00 PM – 7:30 PM"
	}))]));
	let now = datetime!(2024-01-15 21:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("text bob at seven", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(recorded.routed.path, RoutePath::Extraction);
	assert!(recorded.routed.deferred);
	assert_eq!(recorded.writes[0].action, ActionKind::ToDo);
	assert_eq!(cell_text(&blocks(&store), "7:00 PM – 7:30 PM").as_deref(), Some(""));
	assert!(
		paragraphs(&blocks(&store)).iter().any(|text| text.ends_with("#16_Jan_2024_19_00"))
	);
}

#[tokio::test]
async fn tomorrows_reminder_skips_todays_grid() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([Reply::Json(serde_json::json!({
		"isReminder": true,
		"task": "dentist",
		"targetDate": "2024-01-16",
		"targetTime": "09:00",
		"actions": ["timeSlot", "todo"]
	}))]));
	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store.clone(), &extractor, now);
	let recorded = service
		.record(&doc_id(), &VoiceEntry::new("checkup tomorrow at 9", now))
		.await
		.expect("Record must succeed.");

	assert_eq!(recorded.routed.path, RoutePath::Extraction);
	assert_eq!(recorded.writes.len(), 1);
	assert_eq!(recorded.writes[0].action, ActionKind::ToDo);
	assert_eq!(cell_text(&blocks(&store), "9:00 AM – 9:30 AM").as_deref(), Some(""));
	assert!(paragraphs(&blocks(&store)).contains(&"dentist #16_Jan_2024_09_00".to_string()));
}

#[tokio::test]
async fn slow_health_check_and_slow_extraction_share_one_deadline() {
	let store = full_planner();
	let extractor = Arc::new(ScriptedExtractor::new([Reply::Slow(
		Duration::from_millis(150),
		serde_json::json!({ "timeSlot": "7:00 PM – 7:30 PM" }),
	)]));

	extractor.set_probe_delay(Duration::from_millis(150));

	let now = datetime!(2024-01-15 15:00 UTC);
	let service = service(store, &extractor, now);
	let started = std::time::Instant::now();
	let routed = service.route(&VoiceEntry::new("swim at 7", now)).await;
	let elapsed = started.elapsed();

	assert_eq!(routed.path, RoutePath::Fallback);
	assert_eq!(extractor.probe_calls(), 1);
	assert!(elapsed < Duration::from_millis(300), "Routing took {elapsed:?}.");
}
