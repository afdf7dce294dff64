use serde::Serialize;
use time::OffsetDateTime;

use daygrid_document::DocumentId;
use daygrid_domain::{
	ActionKind, Intent, IntentKind, JournalNote, ReminderTag, SlotRange, reminder, temporal,
};

use crate::{DaygridService, Placement, Result, Routed, VoiceEntry};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionOutcome {
	pub action: ActionKind,
	pub placement: Placement,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recorded {
	pub routed: Routed,
	pub writes: Vec<ActionOutcome>,
}

impl DaygridService {
	/// Routes one entry and writes it to every destination its intent asks for.
	pub async fn record(&self, doc_id: &DocumentId, entry: &VoiceEntry) -> Result<Recorded> {
		let routed = self.route(entry).await;
		let writes = self.dispatch(doc_id, &routed.intent, entry.occurred_at).await?;

		Ok(Recorded { routed, writes })
	}

	/// Writes `intent` to each of its destinations, one fresh placement per destination.
	pub async fn dispatch(
		&self,
		doc_id: &DocumentId,
		intent: &Intent,
		now: OffsetDateTime,
	) -> Result<Vec<ActionOutcome>> {
		let sections = &self.cfg.template.sections;
		let all_headings: Vec<String> = sections
			.todo
			.iter()
			.chain(&sections.journal)
			.chain(&sections.notes)
			.cloned()
			.collect();
		let placement = self.placement();
		let mut writes = Vec::new();

		for action in intent.effective_actions() {
			let placed = match action {
				ActionKind::TimeSlot => {
					let slot = grid_slot(intent, now, self.cfg.template.slot_minutes);

					placement.place_in_grid(doc_id, slot, intent.body()).await?
				},
				ActionKind::ToDo => {
					let content = todo_text(intent);

					placement
						.place_under_heading(doc_id, &sections.todo, &all_headings, &content)
						.await?
				},
				ActionKind::Journal =>
					placement
						.place_under_heading(
							doc_id,
							&sections.journal,
							&all_headings,
							&journal_text(intent),
						)
						.await?,
				ActionKind::Note =>
					placement
						.place_under_heading(doc_id, &sections.notes, &all_headings, intent.body())
						.await?,
			};

			tracing::info!(?action, placement = ?placed, "Entry written.");
			writes.push(ActionOutcome { action, placement: placed });
		}

		Ok(writes)
	}
}

fn grid_slot(intent: &Intent, now: OffsetDateTime, slot_minutes: u16) -> SlotRange {
	match &intent.kind {
		IntentKind::TimedActivity(activity) => activity.slot,
		IntentKind::Reminder(due) => {
			let tag = ReminderTag::at(due.target_date, due.target_time);

			SlotRange::floor_at(tag.minute_of_day(), slot_minutes)
		},
		IntentKind::Note(_) | IntentKind::JournalNote(_) =>
			temporal::inferred_slot(now, slot_minutes),
	}
}

fn todo_text(intent: &Intent) -> String {
	match &intent.kind {
		IntentKind::Reminder(due) =>
			reminder::encode(&due.task, &ReminderTag::at(due.target_date, due.target_time)),
		_ => intent.body().to_string(),
	}
}

fn journal_text(intent: &Intent) -> String {
	match &intent.kind {
		IntentKind::JournalNote(journal) => format_journal(journal),
		_ => intent.body().to_string(),
	}
}

/// Journal body, then `#tags`, then the people mentioned.
pub fn format_journal(journal: &JournalNote) -> String {
	let mut out = journal.body.trim().to_string();

	for tag in &journal.inferred_tags {
		let tag: String = tag.split_whitespace().collect();

		if !tag.is_empty() {
			out.push_str(" #");
			out.push_str(&tag);
		}
	}
	if !journal.mentioned_persons.is_empty() {
		out.push_str(&format!(" (with {})", journal.mentioned_persons.join(", ")));
	}

	out
}
