use std::collections::BTreeSet;

use serde::Serialize;
use time::{Date, Time};

use crate::slot::SlotRange;

/// Destinations a single entry may be written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
	TimeSlot,
	Journal,
	ToDo,
	Note,
}
impl ActionKind {
	/// Lenient parser for the names extraction backends tend to emit.
	pub fn parse(raw: &str) -> Option<Self> {
		let key: String = raw
			.chars()
			.filter(|ch| ch.is_ascii_alphanumeric())
			.map(|ch| ch.to_ascii_lowercase())
			.collect();

		match key.as_str() {
			"timeslot" | "slot" | "schedule" => Some(Self::TimeSlot),
			"journal" | "journalentry" => Some(Self::Journal),
			"todo" | "task" | "tasks" | "reminder" => Some(Self::ToDo),
			"note" | "notes" => Some(Self::Note),
			_ => None,
		}
	}
}

pub type ActionSet = BTreeSet<ActionKind>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
	Positive,
	Negative,
	#[default]
	Neutral,
}
impl Sentiment {
	pub fn parse(raw: &str) -> Self {
		match raw.trim().to_ascii_lowercase().as_str() {
			"positive" | "happy" | "good" => Self::Positive,
			"negative" | "sad" | "bad" => Self::Negative,
			_ => Self::Neutral,
		}
	}
}

/// Activity categories recognised by the fast path, in matching priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	Meeting,
	Fitness,
	Errand,
	Meal,
	Work,
	Personal,
}
impl Category {
	pub const ALL: [Self; 6] =
		[Self::Meeting, Self::Fitness, Self::Errand, Self::Meal, Self::Work, Self::Personal];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Meeting => "meeting",
			Self::Fitness => "fitness",
			Self::Errand => "errand",
			Self::Meal => "meal",
			Self::Work => "work",
			Self::Personal => "personal",
		}
	}

	pub fn keywords(self) -> &'static [&'static str] {
		match self {
			Self::Meeting => &[
				"meeting",
				"meetings",
				"standup",
				"sync",
				"interview",
				"appointment",
				"conference",
				"call",
			],
			Self::Fitness =>
				&["gym", "workout", "run", "running", "jog", "yoga", "exercise", "pilates", "hike"],
			Self::Errand => &[
				"errand", "errands", "groceries", "grocery", "pharmacy", "shopping", "pickup",
				"bank", "laundry",
			],
			Self::Meal => &["breakfast", "lunch", "dinner", "brunch", "meal", "coffee", "snack"],
			Self::Work =>
				&["work", "project", "deadline", "email", "emails", "report", "presentation"],
			Self::Personal => &[
				"family", "friend", "friends", "mom", "dad", "kids", "birthday", "doctor",
				"dentist",
			],
		}
	}
}

/// Which classifier produced an intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
	FastPath,
	Extraction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reminder {
	pub task: String,
	#[serde(with = "crate::time_serde::date")]
	pub target_date: Date,
	#[serde(with = "crate::time_serde::clock")]
	pub target_time: Time,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimedActivity {
	pub slot: SlotRange,
	pub has_explicit_time: bool,
	/// Minute of day the speaker named, before it was rounded down to a row.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub clock_minute: Option<u16>,
	pub is_retrospective: bool,
	pub context: Option<String>,
	pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Note {
	pub context: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JournalNote {
	pub mentioned_persons: Vec<String>,
	pub sentiment: Sentiment,
	pub inferred_tags: Vec<String>,
	pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentKind {
	Reminder(Reminder),
	TimedActivity(TimedActivity),
	Note(Note),
	JournalNote(JournalNote),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Intent {
	pub kind: IntentKind,
	pub confidence: f32,
	pub source: Source,
	/// Destinations requested explicitly; empty means the kind's default destination.
	pub actions: ActionSet,
}
impl Intent {
	pub fn new(kind: IntentKind, confidence: f32, source: Source) -> Self {
		let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };

		Self { kind, confidence, source, actions: ActionSet::new() }
	}

	pub fn with_actions(mut self, actions: ActionSet) -> Self {
		self.actions = actions;

		self
	}

	/// The destinations this entry must be written to.
	pub fn effective_actions(&self) -> ActionSet {
		if !self.actions.is_empty() {
			return self.actions.clone();
		}

		let default = match &self.kind {
			IntentKind::Reminder(_) => ActionKind::ToDo,
			IntentKind::TimedActivity(_) => ActionKind::TimeSlot,
			IntentKind::Note(_) => ActionKind::Note,
			IntentKind::JournalNote(_) => ActionKind::Journal,
		};

		ActionSet::from([default])
	}

	/// A reminder that already carries both a task and a date needs no second opinion.
	pub fn is_complete_reminder(&self) -> bool {
		matches!(&self.kind, IntentKind::Reminder(reminder) if !reminder.task.trim().is_empty())
	}

	/// Free text describing the entry, used when writing to any destination.
	pub fn body(&self) -> &str {
		match &self.kind {
			IntentKind::Reminder(reminder) => &reminder.task,
			IntentKind::TimedActivity(activity) => &activity.body,
			IntentKind::Note(note) => &note.context,
			IntentKind::JournalNote(journal) => &journal.body,
		}
	}
}
