//! Anchoring intents to "now": slot inference and past-time deferral.

use time::{Date, OffsetDateTime, UtcOffset};

use crate::{
	clock,
	intent::{ActionKind, ActionSet, Intent, IntentKind, Reminder, TimedActivity},
	slot::SlotRange,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
	pub intent: Intent,
	/// True when an explicit but already-passed time was turned into a reminder for tomorrow.
	pub deferred: bool,
}

/// Source of "now" for everything that compares against the current instant.
pub trait Clock
where
	Self: Send + Sync,
{
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock reported in a fixed offset.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
	offset: UtcOffset,
}
impl SystemClock {
	pub fn new(offset: UtcOffset) -> Self {
		Self { offset }
	}
}
impl Default for SystemClock {
	fn default() -> Self {
		Self::new(UtcOffset::UTC)
	}
}
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc().to_offset(self.offset)
	}
}

pub fn minute_of_day(at: OffsetDateTime) -> u16 {
	u16::from(at.hour()) * 60 + u16::from(at.minute())
}

/// The slot enclosing `now`, rounded down to a `width` boundary.
pub fn inferred_slot(now: OffsetDateTime, width: u16) -> SlotRange {
	SlotRange::floor_at(minute_of_day(now), width)
}

pub fn tomorrow(now: OffsetDateTime) -> Date {
	now.date().next_day().unwrap_or(now.date())
}

/// Applies the deferral rule.
///
/// An explicit time that already passed today becomes a reminder for the same clock time
/// tomorrow, unless the entry is retrospective. The comparison uses the minute the speaker named,
/// not the start of its row. Inferred slots always stay on today. Reminders never point into the
/// past, and a reminder for another day is never written into today's grid.
pub fn resolve(intent: Intent, now: OffsetDateTime) -> Resolved {
	let Intent { kind, confidence, source, mut actions } = intent;
	let now_minute = minute_of_day(now);

	match kind {
		IntentKind::TimedActivity(activity)
			if activity.has_explicit_time
				&& !activity.is_retrospective
				&& spoken_minute(&activity) < now_minute =>
		{
			let mut task = clock::strip_day_words(&clock::strip_time_phrases(&activity.body));

			if task.is_empty() {
				task = activity.context.clone().unwrap_or_else(|| activity.body.clone());
			}
			redirect_to_todo(&mut actions);

			let reminder = Reminder {
				task,
				target_date: tomorrow(now),
				target_time: SlotRange::floor_at(spoken_minute(&activity), 1).start_time(),
			};

			Resolved {
				intent: Intent::new(IntentKind::Reminder(reminder), confidence, source)
					.with_actions(actions),
				deferred: true,
			}
		},
		IntentKind::Reminder(mut reminder) => {
			let today = now.date();
			let deferred = reminder.target_date < today
				|| (reminder.target_date == today && reminder.target_time < now.time());

			if deferred {
				reminder.target_date = tomorrow(now);
			}
			// Today's grid has no row for another day.
			if reminder.target_date != today {
				redirect_to_todo(&mut actions);
			}

			Resolved {
				intent: Intent::new(IntentKind::Reminder(reminder), confidence, source)
					.with_actions(actions),
				deferred,
			}
		},
		kind => Resolved {
			intent: Intent::new(kind, confidence, source).with_actions(actions),
			deferred: false,
		},
	}
}

fn spoken_minute(activity: &TimedActivity) -> u16 {
	activity.clock_minute.unwrap_or_else(|| activity.slot.start_minute())
}

fn redirect_to_todo(actions: &mut ActionSet) {
	if actions.remove(&ActionKind::TimeSlot) {
		actions.insert(ActionKind::ToDo);
	}
}

#[cfg(test)]
mod tests {
	use time::macros::{date, datetime, time};

	use super::*;
	use crate::intent::Source;

	fn activity(start: u16, explicit: bool, retrospective: bool) -> Intent {
		Intent::new(
			IntentKind::TimedActivity(TimedActivity {
				slot: SlotRange::floor_at(start, 30),
				has_explicit_time: explicit,
				clock_minute: explicit.then_some(start),
				is_retrospective: retrospective,
				context: Some("fitness".to_string()),
				body: "swim at 7 am".to_string(),
			}),
			0.9,
			Source::FastPath,
		)
	}

	#[test]
	fn past_explicit_time_becomes_tomorrow_reminder() {
		let now = datetime!(2024-01-15 15:00 UTC);
		let resolved = resolve(activity(7 * 60, true, false), now);

		assert!(resolved.deferred);

		let IntentKind::Reminder(reminder) = resolved.intent.kind else {
			panic!("Expected a reminder.");
		};

		assert_eq!(reminder.task, "swim");
		assert_eq!(reminder.target_date, date!(2024 - 01 - 16));
		assert_eq!(reminder.target_time, time!(07:00));
	}

	#[test]
	fn retrospective_and_inferred_slots_stay_today() {
		let now = datetime!(2024-01-15 15:00 UTC);

		assert!(!resolve(activity(7 * 60, true, true), now).deferred);
		assert!(!resolve(activity(7 * 60, false, false), now).deferred);
		assert!(!resolve(activity(19 * 60, true, false), now).deferred);
	}

	#[test]
	fn deferral_keeps_the_spoken_minute() {
		let now = datetime!(2024-01-15 15:00 UTC);
		let resolved = resolve(activity(7 * 60 + 45, true, false), now);
		let IntentKind::Reminder(reminder) = resolved.intent.kind else {
			panic!("Expected a reminder.");
		};

		assert_eq!(reminder.target_time, time!(07:45));
	}

	#[test]
	fn time_still_ahead_inside_current_row_stays_today() {
		let now = datetime!(2024-01-15 15:05 UTC);
		let resolved = resolve(activity(15 * 60 + 10, true, false), now);

		assert!(!resolved.deferred);
		assert!(matches!(resolved.intent.kind, IntentKind::TimedActivity(_)));
		assert!(resolve(activity(15 * 60 + 4, true, false), now).deferred);
	}

	#[test]
	fn stale_reminder_moves_forward() {
		let now = datetime!(2024-01-15 15:00 UTC);
		let intent = Intent::new(
			IntentKind::Reminder(Reminder {
				task: "pay rent".to_string(),
				target_date: date!(2024 - 01 - 15),
				target_time: time!(09:00),
			}),
			0.8,
			Source::Extraction,
		);
		let resolved = resolve(intent, now);
		let IntentKind::Reminder(reminder) = resolved.intent.kind else {
			panic!("Expected a reminder.");
		};

		assert_eq!(reminder.target_date, date!(2024 - 01 - 16));
	}

	#[test]
	fn timeslot_action_is_redirected_to_todo() {
		let now = datetime!(2024-01-15 15:00 UTC);
		let intent = activity(7 * 60, true, false)
			.with_actions([ActionKind::TimeSlot, ActionKind::Journal].into());
		let resolved = resolve(intent, now);

		assert!(resolved.intent.actions.contains(&ActionKind::ToDo));
		assert!(resolved.intent.actions.contains(&ActionKind::Journal));
		assert!(!resolved.intent.actions.contains(&ActionKind::TimeSlot));
	}

	#[test]
	fn reminder_for_another_day_leaves_the_grid() {
		let now = datetime!(2024-01-15 15:00 UTC);
		let reminder = |target_date, target_time| {
			Intent::new(
				IntentKind::Reminder(Reminder {
					task: "dentist".to_string(),
					target_date,
					target_time,
				}),
				0.85,
				Source::Extraction,
			)
			.with_actions([ActionKind::TimeSlot, ActionKind::ToDo].into())
		};
		let tomorrow = resolve(reminder(date!(2024 - 01 - 16), time!(09:00)), now);
		let later_today = resolve(reminder(date!(2024 - 01 - 15), time!(17:00)), now);

		assert_eq!(tomorrow.intent.actions, ActionSet::from([ActionKind::ToDo]));
		assert!(later_today.intent.actions.contains(&ActionKind::TimeSlot));
	}
}
