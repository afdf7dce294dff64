//! Slow path: prompt construction, output normalization and the cached health probe.

use std::sync::Mutex;

use serde::Deserialize;
use serde_json::Value;
use time::{
	Date, OffsetDateTime, Time, format_description::well_known::Rfc3339,
	macros::format_description,
};
use tokio::time::Instant;

use daygrid_config::Template;
use daygrid_domain::{
	ActionKind, ActionSet, Intent, IntentKind, JournalNote, Note, Reminder, Sentiment, SlotRange,
	Source, TimedActivity, clock, temporal,
};

use crate::{DaygridService, Error, Result, VoiceEntry};

/// Confidence given to backend answers that do not state their own.
pub const EXTRACTION_CONFIDENCE: f32 = 0.85;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractorOutput {
	pub is_reminder: Option<bool>,
	pub task: Option<String>,
	pub target_date: Option<String>,
	pub target_time: Option<String>,
	pub time_slot: Option<String>,
	pub has_explicit_time: Option<bool>,
	pub context: Option<String>,
	pub mentioned_persons: Option<Vec<String>>,
	pub sentiment: Option<String>,
	pub inferred_hashtags: Option<Vec<String>>,
	pub actions: Option<Vec<String>>,
	pub journal_entry: Option<String>,
	pub is_retrospective: Option<bool>,
	pub confidence: Option<f32>,
}

/// Last health probe result, trusted for `ttl`.
pub struct CachedProbe {
	ttl: time::Duration,
	last: Mutex<Option<(OffsetDateTime, bool)>>,
}
impl CachedProbe {
	pub fn new(ttl_ms: u64) -> Self {
		let ttl = time::Duration::milliseconds(i64::try_from(ttl_ms).unwrap_or(i64::MAX));

		Self { ttl, last: Mutex::new(None) }
	}

	/// The cached verdict, if it was recorded less than `ttl` before `now`.
	pub fn get(&self, now: OffsetDateTime) -> Option<bool> {
		let last = self.last.lock().unwrap_or_else(|err| err.into_inner());
		let (at, up) = (*last)?;
		let age = now - at;

		(age >= time::Duration::ZERO && age < self.ttl).then_some(up)
	}

	pub fn record(&self, now: OffsetDateTime, up: bool) {
		*self.last.lock().unwrap_or_else(|err| err.into_inner()) = Some((now, up));
	}
}

impl DaygridService {
	/// Whether the backend is worth calling, probing at most once per cache window.
	///
	/// The probe gives up at `deadline`, which it shares with the extraction that follows.
	pub async fn backend_available(&self, deadline: Instant) -> bool {
		let now = self.clock.now();

		if let Some(up) = self.probe.get(now) {
			return up;
		}

		let probe = self.extractor.probe(&self.cfg.providers.llm_extractor);
		let up = match tokio::time::timeout_at(deadline, probe).await {
			Ok(Ok(up)) => up,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Extraction backend health probe failed.");

				false
			},
			Err(_) => {
				tracing::warn!("Extraction backend health probe timed out.");

				false
			},
		};

		tracing::debug!(up, "Recorded extraction backend health.");
		self.probe.record(now, up);

		up
	}
}

pub fn build_messages(entry: &VoiceEntry, template: &Template) -> Result<Vec<Value>> {
	let schema = serde_json::json!({
		"isReminder": "boolean",
		"task": "string|null",
		"targetDate": "YYYY-MM-DD|null",
		"targetTime": "HH:MM (24-hour)|null",
		"timeSlot": "H:MM AM – H:MM PM|null",
		"hasExplicitTime": "boolean",
		"context": "meeting|fitness|errand|meal|work|personal|null",
		"mentionedPersons": "string[]",
		"sentiment": "positive|negative|neutral",
		"inferredHashtags": "string[]",
		"actions": "(time_slot|journal|todo|note)[]",
		"journalEntry": "string|null",
		"isRetrospective": "boolean",
		"confidence": 0.0
	});
	let system_prompt = concat!(
		"You turn one short spoken phrase into a structured entry for a daily planner. ",
		"Output a single JSON object only, matching the provided schema. ",
		"Set isReminder when the speaker asks to be reminded later; ",
		"then fill task, targetDate and targetTime. ",
		"Otherwise fill timeSlot with the planner row the phrase belongs to, ",
		"or null when no time is implied. ",
		"Set hasExplicitTime to false when timeSlot was guessed rather than spoken. ",
		"Resolve relative dates against the current instant. ",
		"Set isRetrospective when the phrase describes something that already happened. ",
		"Do not invent people, tags or times that the phrase does not support."
	);
	let now = entry.occurred_at.format(&Rfc3339).map_err(|err| Error::InvalidRequest {
		message: format!("Failed to format entry timestamp: {err}."),
	})?;
	let description =
		template.description.as_deref().unwrap_or("A daily planner with a time grid.");
	let location = match entry.geo {
		Some(geo) => format!("\nLocation: {:.4}, {:.4}", geo.lat, geo.lng),
		None => String::new(),
	};
	let phrase = serde_json::to_string(&entry.text).map_err(|_| Error::InvalidRequest {
		message: "Failed to serialize the phrase for the extractor.".to_string(),
	})?;
	let user_prompt = format!(
		"Return JSON matching this schema:\n{schema}\n\
		Current instant: {now} ({weekday})\n\
		Planner: {description}\n\
		Row width: {slot} minutes{location}\n\
		Phrase as JSON:\n{phrase}",
		weekday = entry.occurred_at.weekday(),
		slot = template.slot_minutes,
	);

	Ok(vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	])
}

/// Turns a recovered backend object into an intent, or explains why it cannot.
pub fn normalize(raw: Value, entry: &VoiceEntry, slot_minutes: u16) -> Result<Intent> {
	if !raw.is_object() {
		return Err(Error::Unusable { message: "Extractor output is not an object.".to_string() });
	}

	let output: ExtractorOutput = serde_json::from_value(raw).map_err(|err| Error::Unusable {
		message: format!("Extractor output has bad fields: {err}."),
	})?;
	let text = daygrid_domain::normalize_utterance(&entry.text);
	let actions: ActionSet = output
		.actions
		.iter()
		.flatten()
		.filter_map(|raw| ActionKind::parse(raw))
		.collect();
	let confidence = output.confidence.unwrap_or(EXTRACTION_CONFIDENCE);
	let kind = if output.is_reminder.unwrap_or(false) {
		IntentKind::Reminder(reminder(&output, entry.occurred_at, slot_minutes)?)
	} else {
		activity_kind(output, &text, &actions, entry.occurred_at, slot_minutes)
	};

	Ok(Intent::new(kind, confidence, Source::Extraction).with_actions(actions))
}

fn reminder(output: &ExtractorOutput, now: OffsetDateTime, slot_minutes: u16) -> Result<Reminder> {
	let task = non_blank(output.task.as_deref())
		.ok_or_else(|| Error::Unusable { message: "Reminder has no task.".to_string() })?;
	let raw_date = non_blank(output.target_date.as_deref())
		.ok_or_else(|| Error::Unusable { message: "Reminder has no target date.".to_string() })?;
	let target_date = parse_date(&raw_date).ok_or_else(|| Error::Unusable {
		message: format!("Reminder date {raw_date:?} is not a calendar date."),
	})?;
	let target_time = non_blank(output.target_time.as_deref())
		.and_then(|raw| parse_time(&raw))
		.unwrap_or_else(|| temporal::inferred_slot(now, slot_minutes).start_time());

	Ok(Reminder { task, target_date, target_time })
}

fn activity_kind(
	output: ExtractorOutput,
	text: &str,
	actions: &ActionSet,
	now: OffsetDateTime,
	slot_minutes: u16,
) -> IntentKind {
	let slot = non_blank(output.time_slot.as_deref())
		.and_then(|raw| SlotRange::parse_label_with_width(&raw, slot_minutes))
		.map(|slot| adjust_slot(slot, text));
	let journal = non_blank(output.journal_entry.as_deref());

	if slot.is_some() || actions.contains(&ActionKind::TimeSlot) {
		let explicit = slot.filter(|_| output.has_explicit_time.unwrap_or(true));

		return IntentKind::TimedActivity(TimedActivity {
			slot: slot.unwrap_or_else(|| temporal::inferred_slot(now, slot_minutes)),
			has_explicit_time: explicit.is_some(),
			clock_minute: explicit.map(|slot| spoken_minute_within(slot, text, now)),
			is_retrospective: output.is_retrospective.unwrap_or(false),
			context: non_blank(output.context.as_deref()),
			body: journal.unwrap_or_else(|| text.to_string()),
		});
	}
	if journal.is_some() || actions.contains(&ActionKind::Journal) {
		return IntentKind::JournalNote(JournalNote {
			mentioned_persons: clean_list(output.mentioned_persons),
			sentiment: output.sentiment.as_deref().map(Sentiment::parse).unwrap_or_default(),
			inferred_tags: clean_list(output.inferred_hashtags)
				.into_iter()
				.map(|tag| tag.trim_start_matches('#').to_string())
				.filter(|tag| !tag.is_empty())
				.collect(),
			body: journal.unwrap_or_else(|| text.to_string()),
		});
	}

	IntentKind::Note(Note {
		context: non_blank(output.task.as_deref()).unwrap_or_else(|| text.to_string()),
	})
}

/// Re-applies the context-word AM/PM correction unless the speaker named the meridiem.
fn adjust_slot(slot: SlotRange, text: &str) -> SlotRange {
	if clock::find_clock(text).is_some_and(|found| found.clock.is_unambiguous()) {
		return slot;
	}

	let start = slot.start_minute();
	let adjusted = clock::adjust_for_context(start, clock::context_meridiem(text));

	slot.shifted(i32::from(adjusted) - i32::from(start)).unwrap_or(slot)
}

/// The utterance's own clock when it falls inside the backend's row, else the row start.
fn spoken_minute_within(slot: SlotRange, text: &str, now: OffsetDateTime) -> u16 {
	clock::find_clock(text)
		.map(|found| {
			clock::resolve_minute(
				&found.clock,
				temporal::minute_of_day(now),
				clock::context_meridiem(text),
			)
		})
		.filter(|minute| slot.contains(*minute))
		.unwrap_or_else(|| slot.start_minute())
}

fn parse_date(raw: &str) -> Option<Date> {
	let raw = raw.get(..10).unwrap_or(raw);

	Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

fn parse_time(raw: &str) -> Option<Time> {
	if let Some(slot) = SlotRange::parse_label_with_width(raw, 1) {
		return Some(slot.start_time());
	}

	// "19:00:00"
	let (clock, _) = raw.trim().rsplit_once(':')?;

	SlotRange::parse_label_with_width(clock, 1).map(|slot| slot.start_time())
}

fn non_blank(raw: Option<&str>) -> Option<String> {
	raw.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

fn clean_list(raw: Option<Vec<String>>) -> Vec<String> {
	raw.unwrap_or_default()
		.into_iter()
		.map(|item| item.trim().to_string())
		.filter(|item| !item.is_empty())
		.collect()
}
