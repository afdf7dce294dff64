use std::collections::HashSet;

use serde::Serialize;
use time::Date;

use daygrid_document::{DailyIndex, DocumentId};
use daygrid_domain::{DecodedReminder, SlotRange, reminder};

use crate::{DaygridService, Placement, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CarriedReminder {
	pub task: String,
	pub token: String,
	pub placement: Placement,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CarryForwardReport {
	pub placed: Vec<CarriedReminder>,
	pub scanned_days: usize,
	pub duplicates: usize,
	pub already_present: usize,
	pub skipped_tokens: usize,
}

impl DaygridService {
	/// Copies reminders due on `day` from the preceding days' documents into `doc_id`'s grid.
	///
	/// Identical reminders are placed once, and reminders already present in the target
	/// document are left alone, so running this twice is harmless.
	pub async fn carry_forward_reminders(
		&self,
		index: &dyn DailyIndex,
		doc_id: &DocumentId,
		day: Date,
	) -> Result<CarryForwardReport> {
		let mut report = CarryForwardReport::default();
		let mut seen = HashSet::new();
		let mut due: Vec<DecodedReminder> = Vec::new();

		for back in 1..=self.cfg.reminders.lookback_days {
			let Some(prior_day) = day.checked_sub(time::Duration::days(i64::from(back))) else {
				break;
			};
			let Some(prior_doc) = index.document_for(prior_day).await? else {
				continue;
			};

			if &prior_doc == doc_id {
				continue;
			}

			let structure = match self.store.structure(&prior_doc).await {
				Ok(structure) => structure,
				Err(err) => {
					tracing::warn!(error = %err, day = %prior_day, "Skipped unreadable prior day.");

					continue;
				},
			};
			let (found, rejected) = reminder::due_on(&structure.plain_text(), day);

			report.scanned_days += 1;

			for bad in rejected {
				tracing::warn!(
					token = %bad.token,
					error = %bad.error,
					day = %prior_day,
					"Skipped malformed reminder tag."
				);

				report.skipped_tokens += 1;
			}
			for item in found {
				if seen.insert(item.clone()) {
					due.push(item);
				} else {
					report.duplicates += 1;
				}
			}
		}

		due.sort_by_key(|item| item.tag.minute_of_day());

		let existing = self.store.structure(doc_id).await?.plain_text();
		let placement = self.placement();

		for item in due {
			let content = reminder::encode(&item.task, &item.tag);

			if existing.contains(&content) {
				report.already_present += 1;

				continue;
			}

			let slot =
				SlotRange::floor_at(item.tag.minute_of_day(), self.cfg.template.slot_minutes);
			let placed = placement.place_in_grid(doc_id, slot, &content).await?;

			tracing::info!(task = %item.task, placement = ?placed, "Carried reminder forward.");
			report.placed.push(CarriedReminder {
				task: item.task,
				token: item.tag.to_string(),
				placement: placed,
			});
		}

		Ok(report)
	}
}
