pub mod classifier;
pub mod clock;
pub mod intent;
pub mod reminder;
pub mod slot;
pub mod temporal;
pub mod time_serde;

pub use classifier::FastPathClassifier;
pub use intent::{
	ActionKind, ActionSet, Category, Intent, IntentKind, JournalNote, Note, Reminder, Sentiment,
	Source, TimedActivity,
};
pub use reminder::{DecodedReminder, RejectedTag, ReminderTag, TagError};
pub use slot::SlotRange;
pub use temporal::{Clock, Resolved, SystemClock};

use unicode_normalization::UnicodeNormalization;

/// NFKC-normalizes an utterance and collapses runs of whitespace.
pub fn normalize_utterance(input: &str) -> String {
	let normalized: String = input.nfkc().collect();

	normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}
