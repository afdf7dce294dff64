//! Reminder hashtags: `#DD_Mon_YYYY_HH_MM`.
//!
//! The token is the only durable record of a deferred reminder. It is written next to the task
//! text and rediscovered later by scanning documents, so the grammar must never change.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use time::{Date, Month, Time};

const MONTHS: [(&str, Month); 12] = [
	("Jan", Month::January),
	("Feb", Month::February),
	("Mar", Month::March),
	("Apr", Month::April),
	("May", Month::May),
	("Jun", Month::June),
	("Jul", Month::July),
	("Aug", Month::August),
	("Sep", Month::September),
	("Oct", Month::October),
	("Nov", Month::November),
	("Dec", Month::December),
];

// Looser than the grammar: malformed tokens must surface as errors, not as task text.
static CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"#\d+_[A-Za-z]+_\d+_\d+_\d+\b").expect("reminder tag pattern is valid")
});
static STRICT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^#(\d{2})_([A-Za-z]{3})_(\d{4})_(\d{2})_(\d{2})$")
		.expect("strict reminder tag pattern is valid")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagError {
	Malformed,
	UnknownMonth,
	InvalidDate,
	InvalidTime,
}
impl fmt::Display for TagError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let reason = match self {
			Self::Malformed => "token does not follow #DD_Mon_YYYY_HH_MM",
			Self::UnknownMonth => "month abbreviation is unknown",
			Self::InvalidDate => "day does not exist in that month",
			Self::InvalidTime => "hour or minute is out of range",
		};

		f.write_str(reason)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReminderTag {
	pub date: Date,
	pub hour: u8,
	pub minute: u8,
}
impl ReminderTag {
	pub fn new(date: Date, hour: u8, minute: u8) -> Option<Self> {
		if hour > 23 || minute > 59 {
			return None;
		}

		Some(Self { date, hour, minute })
	}

	pub fn at(date: Date, time: Time) -> Self {
		Self { date, hour: time.hour(), minute: time.minute() }
	}

	pub fn time(&self) -> Time {
		Time::from_hms(self.hour, self.minute, 0).unwrap_or(Time::MIDNIGHT)
	}

	pub fn minute_of_day(&self) -> u16 {
		u16::from(self.hour) * 60 + u16::from(self.minute)
	}

	pub fn parse(token: &str) -> Result<Self, TagError> {
		let caps = STRICT.captures(token.trim()).ok_or(TagError::Malformed)?;
		let number = |index: usize| -> Result<u16, TagError> {
			caps.get(index)
				.ok_or(TagError::Malformed)?
				.as_str()
				.parse()
				.map_err(|_| TagError::Malformed)
		};
		let month_text = caps.get(2).ok_or(TagError::Malformed)?.as_str();
		let month = MONTHS
			.iter()
			.find(|(abbr, _)| abbr.eq_ignore_ascii_case(month_text))
			.map(|(_, month)| *month)
			.ok_or(TagError::UnknownMonth)?;
		let day = u8::try_from(number(1)?).map_err(|_| TagError::InvalidDate)?;
		let year = i32::from(number(3)?);
		let date = Date::from_calendar_date(year, month, day).map_err(|_| TagError::InvalidDate)?;
		let hour = u8::try_from(number(4)?).map_err(|_| TagError::InvalidTime)?;
		let minute = u8::try_from(number(5)?).map_err(|_| TagError::InvalidTime)?;

		Self::new(date, hour, minute).ok_or(TagError::InvalidTime)
	}
}
impl fmt::Display for ReminderTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let month = MONTHS
			.iter()
			.find(|(_, month)| *month == self.date.month())
			.map(|(abbr, _)| *abbr)
			.unwrap_or("Jan");

		write!(
			f,
			"#{:02}_{month}_{:04}_{:02}_{:02}",
			self.date.day(),
			self.date.year(),
			self.hour,
			self.minute
		)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecodedReminder {
	pub task: String,
	pub tag: ReminderTag,
}

/// A candidate token that failed to parse, kept so callers can report it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedTag {
	pub token: String,
	pub error: TagError,
}

/// Appends the tag for `(date, hour, minute)` to the task text.
pub fn encode(task: &str, tag: &ReminderTag) -> String {
	let task = task.trim();

	if task.is_empty() { tag.to_string() } else { format!("{task} {tag}") }
}

/// Extracts every reminder in `text`, one task per line. Bad tokens are returned separately and
/// never stop the scan.
pub fn decode(text: &str) -> (Vec<DecodedReminder>, Vec<RejectedTag>) {
	let mut decoded = Vec::new();
	let mut rejected = Vec::new();

	for line in text.lines() {
		let tokens: Vec<&str> = CANDIDATE.find_iter(line).map(|m| m.as_str()).collect();

		if tokens.is_empty() {
			continue;
		}

		let task = task_text(&CANDIDATE.replace_all(line, " "));

		for token in tokens {
			match ReminderTag::parse(token) {
				Ok(tag) => decoded.push(DecodedReminder { task: task.clone(), tag }),
				Err(error) => rejected.push(RejectedTag { token: token.to_string(), error }),
			}
		}
	}

	(decoded, rejected)
}

/// Reminders in `text` that are due on `day`.
pub fn due_on(text: &str, day: Date) -> (Vec<DecodedReminder>, Vec<RejectedTag>) {
	let (decoded, rejected) = decode(text);

	(decoded.into_iter().filter(|reminder| reminder.tag.date == day).collect(), rejected)
}

fn task_text(line: &str) -> String {
	let trimmed = line.trim();
	let trimmed = ["- ", "* ", "• ", "[ ] ", "[x] ", "☐ ", "☑ "]
		.iter()
		.find_map(|marker| trimmed.strip_prefix(marker))
		.unwrap_or(trimmed);

	trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
