//! Deterministic first-pass classification. No I/O, no allocation-heavy work.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
	clock,
	intent::{Category, Intent, IntentKind, Note, Reminder, Source, TimedActivity},
	slot::SlotRange,
	temporal,
};

/// Reminders need date arithmetic this path does not trust itself with.
pub const REMINDER_CONFIDENCE: f32 = 0.2;
pub const CATEGORY_CONFIDENCE: f32 = 0.9;
pub const TIME_ONLY_CONFIDENCE: f32 = 0.7;
pub const UNMATCHED_CONFIDENCE: f32 = 0.3;

static REMINDER_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)\b(?:please\s+)?(?:remind\s+me|set\s+(?:a|an|me\s+a)\s+reminder)\b(?:\s+(?:to|for|about)\b)?",
	)
	.expect("reminder phrase pattern is valid")
});
static LEADING_FILLER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^(?:(?:to|that|about|for)\s+)+").expect("filler pattern is valid")
});

#[derive(Clone, Copy, Debug)]
pub struct FastPathClassifier {
	slot_minutes: u16,
}
impl FastPathClassifier {
	pub fn new(slot_minutes: u16) -> Self {
		Self { slot_minutes: slot_minutes.max(1) }
	}

	pub fn slot_minutes(&self) -> u16 {
		self.slot_minutes
	}

	pub fn classify(&self, text: &str, now: OffsetDateTime) -> Intent {
		let text = crate::normalize_utterance(text);

		if REMINDER_PHRASE.is_match(&text) {
			return self.classify_reminder(&text, now);
		}

		let now_minute = temporal::minute_of_day(now);
		let explicit = clock::find_clock(&text).map(|found| {
			clock::resolve_minute(&found.clock, now_minute, clock::context_meridiem(&text))
		});
		let category = detect_category(&text);
		let confidence = match (category, explicit) {
			(Some(_), _) => CATEGORY_CONFIDENCE,
			(None, Some(_)) => TIME_ONLY_CONFIDENCE,
			(None, None) => UNMATCHED_CONFIDENCE,
		};
		let activity = TimedActivity {
			slot: match explicit {
				Some(minute) => SlotRange::floor_at(minute, self.slot_minutes),
				None => temporal::inferred_slot(now, self.slot_minutes),
			},
			has_explicit_time: explicit.is_some(),
			clock_minute: explicit,
			is_retrospective: false,
			context: category.map(|category| category.as_str().to_string()),
			body: text,
		};

		Intent::new(IntentKind::TimedActivity(activity), confidence, Source::FastPath)
	}

	fn classify_reminder(&self, text: &str, now: OffsetDateTime) -> Intent {
		let target_date = clock::mentions_tomorrow(text).then(|| temporal::tomorrow(now));
		let target_time = match clock::find_clock(text) {
			Some(found) => {
				let minute = clock::resolve_minute(
					&found.clock,
					temporal::minute_of_day(now),
					clock::context_meridiem(text),
				);

				SlotRange::floor_at(minute, 1).start_time()
			},
			None => temporal::inferred_slot(now, self.slot_minutes).start_time(),
		};
		let task = reminder_task(text);
		let kind = match target_date {
			Some(target_date) if !task.is_empty() =>
				IntentKind::Reminder(Reminder { task, target_date, target_time }),
			_ => IntentKind::Note(Note { context: text.to_string() }),
		};

		Intent::new(kind, REMINDER_CONFIDENCE, Source::FastPath)
	}
}

/// First category in table order whose keyword appears as a word of the text.
pub fn detect_category(text: &str) -> Option<Category> {
	let words: HashSet<String> = text.unicode_words().map(|word| word.to_lowercase()).collect();

	Category::ALL
		.into_iter()
		.find(|category| category.keywords().iter().any(|keyword| words.contains(*keyword)))
}

/// The task left once the imperative phrase, day words and clock phrases are removed.
pub fn reminder_task(text: &str) -> String {
	let without_phrase = REMINDER_PHRASE.replace_all(text, " ");
	let stripped = clock::strip_time_phrases(&clock::strip_day_words(&without_phrase));

	LEADING_FILLER.replace(&stripped, "").trim().to_string()
}

#[cfg(test)]
mod tests {
	use time::macros::{date, datetime, time};

	use super::*;

	fn classifier() -> FastPathClassifier {
		FastPathClassifier::new(30)
	}

	#[test]
	fn meeting_with_inferred_slot() {
		let intent = classifier().classify("Meeting with team", datetime!(2024-01-15 10:30 UTC));

		assert!((intent.confidence - CATEGORY_CONFIDENCE).abs() < f32::EPSILON);

		let IntentKind::TimedActivity(activity) = intent.kind else {
			panic!("Expected a timed activity.");
		};

		assert_eq!(activity.context.as_deref(), Some("meeting"));
		assert_eq!(activity.slot.label(), "10:30 AM – 11:00 AM");
		assert!(!activity.has_explicit_time);
	}

	#[test]
	fn reminder_with_tomorrow_is_complete() {
		let intent = classifier()
			.classify("remind me to call mom tomorrow", datetime!(2024-01-15 09:00 UTC));

		assert!((intent.confidence - REMINDER_CONFIDENCE).abs() < f32::EPSILON);
		assert!(intent.is_complete_reminder());

		let IntentKind::Reminder(reminder) = intent.kind else {
			panic!("Expected a reminder.");
		};

		assert_eq!(reminder.task, "call mom");
		assert_eq!(reminder.target_date, date!(2024 - 01 - 16));
		assert_eq!(reminder.target_time, time!(09:00));
	}

	#[test]
	fn reminder_without_date_is_a_note() {
		let now = datetime!(2024-01-15 09:00 UTC);
		let intent = classifier().classify("set a reminder to renew passport", now);

		assert!(matches!(intent.kind, IntentKind::Note(_)));
		assert!(!intent.is_complete_reminder());
	}

	#[test]
	fn reminder_keeps_explicit_time() {
		let now = datetime!(2024-01-15 21:00 UTC);
		let intent = classifier().classify("remind me tomorrow to water plants at 8 am", now);
		let IntentKind::Reminder(reminder) = intent.kind else {
			panic!("Expected a reminder.");
		};

		assert_eq!(reminder.task, "water plants");
		assert_eq!(reminder.target_time, time!(08:00));
	}

	#[test]
	fn time_without_category_is_medium_confidence() {
		let intent = classifier().classify("swim at 7", datetime!(2024-01-15 15:00 UTC));

		assert!((intent.confidence - TIME_ONLY_CONFIDENCE).abs() < f32::EPSILON);

		let IntentKind::TimedActivity(activity) = intent.kind else {
			panic!("Expected a timed activity.");
		};

		assert!(activity.has_explicit_time);
		assert!(activity.context.is_none());
		assert_eq!(activity.slot.start_minute(), 19 * 60);
	}

	#[test]
	fn off_boundary_clock_keeps_its_minute() {
		let intent = classifier().classify("gym at 7:45 am", datetime!(2024-01-15 15:00 UTC));
		let IntentKind::TimedActivity(activity) = intent.kind else {
			panic!("Expected a timed activity.");
		};

		assert_eq!(activity.slot.start_minute(), 7 * 60 + 30);
		assert_eq!(activity.clock_minute, Some(7 * 60 + 45));
	}

	#[test]
	fn context_word_overrides_clock_comparison() {
		let intent = classifier().classify("school drop at 8", datetime!(2024-01-15 06:00 UTC));
		let IntentKind::TimedActivity(activity) = intent.kind else {
			panic!("Expected a timed activity.");
		};

		assert_eq!(activity.slot.start_minute(), 8 * 60);
	}

	#[test]
	fn nothing_matched_floors_now() {
		let intent = classifier().classify("feeling ok", datetime!(2024-01-15 16:51 UTC));

		assert!((intent.confidence - UNMATCHED_CONFIDENCE).abs() < f32::EPSILON);

		let IntentKind::TimedActivity(activity) = intent.kind else {
			panic!("Expected a timed activity.");
		};

		assert_eq!(activity.slot.start_minute(), 16 * 60 + 30);
		assert_eq!(activity.slot.end_minute(), 17 * 60);
	}

	#[test]
	fn category_table_order_wins() {
		assert_eq!(detect_category("lunch meeting"), Some(Category::Meeting));
		assert_eq!(detect_category("gym then groceries"), Some(Category::Fitness));
		assert_eq!(detect_category("nothing"), None);
	}
}
