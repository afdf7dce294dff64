//! Clock references in free text: detection, AM/PM inference and removal.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::slot;

const MERIDIEM: &str = r"(?P<mer>am\b|pm\b|a\.m\.|p\.m\.)";
const LEAD: &str = r"(?:\b(?:at|by|around|from)\s+)?";

const MORNING_WORDS: [&str; 8] =
	["school", "drop", "dropoff", "breakfast", "morning", "sunrise", "wake", "commute"];
const EVENING_WORDS: [&str; 6] = ["dinner", "evening", "tonight", "afternoon", "night", "supper"];

static PATTERNS: LazyLock<Vec<(ClockPattern, Regex)>> = LazyLock::new(|| {
	[
		(
			ClockPattern::HourMinute,
			format!(r"(?i){LEAD}\b(?P<hour>\d{{1,2}}):(?P<minute>[0-5]\d)(?:\s*{MERIDIEM})?"),
		),
		(ClockPattern::HourMeridiem, format!(r"(?i){LEAD}\b(?P<hour>\d{{1,2}})\s*{MERIDIEM}")),
		(ClockPattern::AtHour, format!(r"(?i)\bat\s+(?P<hour>\d{{1,2}})\b(?:\s*{MERIDIEM})?")),
		(ClockPattern::OClock, format!(r"(?i){LEAD}\b(?P<hour>\d{{1,2}})\s*o['’]?\s?clock\b")),
	]
	.into_iter()
	.map(|(pattern, source)| (pattern, Regex::new(&source).expect("clock pattern is valid")))
	.collect()
});
static DAY_WORDS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)\b(?:tomorrow|today)\b").expect("day word pattern is valid"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Meridiem {
	Am,
	Pm,
}
impl Meridiem {
	pub fn from_suffix(raw: &str) -> Self {
		if raw.trim_start().to_ascii_lowercase().starts_with('p') { Self::Pm } else { Self::Am }
	}

	pub fn flip(self) -> Self {
		match self {
			Self::Am => Self::Pm,
			Self::Pm => Self::Am,
		}
	}

	/// Maps a 12-hour clock hour (1-12) onto the 24-hour clock.
	pub fn to_24h(self, hour: u8) -> u8 {
		match self {
			Self::Am => hour % 12,
			Self::Pm => hour % 12 + 12,
		}
	}
}

/// Which detector matched, most specific first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockPattern {
	HourMinute,
	HourMeridiem,
	AtHour,
	OClock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockRef {
	pub hour: u8,
	pub minute: u8,
	pub meridiem: Option<Meridiem>,
	pub pattern: ClockPattern,
}
impl ClockRef {
	/// True when the text alone pins the time of day: an explicit meridiem or a 24-hour hour.
	pub fn is_unambiguous(&self) -> bool {
		self.meridiem.is_some() || self.hour == 0 || self.hour > 12
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockMatch {
	pub clock: ClockRef,
	pub start: usize,
	pub end: usize,
}

/// Finds the first clock reference, trying detectors in order of specificity. Once a detector
/// yields a valid reference the remaining detectors are not consulted.
pub fn find_clock(text: &str) -> Option<ClockMatch> {
	for (pattern, regex) in PATTERNS.iter() {
		for caps in regex.captures_iter(text) {
			let Some(clock) = clock_from_captures(&caps, *pattern) else {
				continue;
			};
			let Some(whole) = caps.get(0) else {
				continue;
			};

			return Some(ClockMatch { clock, start: whole.start(), end: whole.end() });
		}
	}

	None
}

/// AM/PM suggested by context words in the utterance, if any.
pub fn context_meridiem(text: &str) -> Option<Meridiem> {
	for word in text.unicode_words() {
		let word = word.to_lowercase();

		if MORNING_WORDS.contains(&word.as_str()) {
			return Some(Meridiem::Am);
		}
		if EVENING_WORDS.contains(&word.as_str()) {
			return Some(Meridiem::Pm);
		}
	}

	None
}

/// Resolves a clock reference to a minute of today.
///
/// A bare 1-11 hour is settled by `context` when present; otherwise the interpretation that
/// is still ahead of `now_minute` wins, PM when both are ahead and PM when both have passed.
pub fn resolve_minute(clock: &ClockRef, now_minute: u16, context: Option<Meridiem>) -> u16 {
	let minute = u16::from(clock.minute);

	if clock.is_unambiguous() {
		return slot::clock_minute(clock.hour, clock.minute, clock.meridiem)
			.unwrap_or_else(|| u16::from(clock.hour % 24) * 60 + minute);
	}
	if clock.hour == 12 {
		return 12 * 60 + minute;
	}
	if let Some(meridiem) = context {
		return u16::from(meridiem.to_24h(clock.hour)) * 60 + minute;
	}

	let am = u16::from(clock.hour) * 60 + minute;
	let pm = am + 12 * 60;

	match (am >= now_minute, pm >= now_minute) {
		(true, true) => pm,
		(false, true) => pm,
		(true, false) => am,
		(false, false) => pm,
	}
}

/// Applies the context-word AM/PM correction to a minute supplied by someone else.
pub fn adjust_for_context(minute: u16, context: Option<Meridiem>) -> u16 {
	match context {
		Some(Meridiem::Pm) if (60..12 * 60).contains(&minute) => minute + 12 * 60,
		Some(Meridiem::Am) if minute >= 13 * 60 && minute < 24 * 60 => minute - 12 * 60,
		_ => minute,
	}
}

/// Removes every clock phrase (with its leading preposition) from `text`.
pub fn strip_time_phrases(text: &str) -> String {
	let mut out = text.to_string();

	for (_, regex) in PATTERNS.iter() {
		out = regex.replace_all(&out, " ").into_owned();
	}

	tidy(&out)
}

/// Removes the relative day words "today" and "tomorrow".
pub fn strip_day_words(text: &str) -> String {
	tidy(&DAY_WORDS.replace_all(text, " "))
}

pub fn mentions_tomorrow(text: &str) -> bool {
	text.unicode_words().any(|word| word.eq_ignore_ascii_case("tomorrow"))
}

fn tidy(text: &str) -> String {
	let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

	collapsed
		.trim_matches(|ch: char| {
			ch.is_whitespace() || matches!(ch, ',' | '.' | ';' | ':' | '!' | '-')
		})
		.to_string()
}

fn clock_from_captures(caps: &Captures<'_>, pattern: ClockPattern) -> Option<ClockRef> {
	let hour: u8 = caps.name("hour")?.as_str().parse().ok()?;
	let minute: u8 = match caps.name("minute") {
		Some(m) => m.as_str().parse().ok()?,
		None => 0,
	};
	let meridiem = caps.name("mer").map(|m| Meridiem::from_suffix(m.as_str()));

	slot::clock_minute(hour, minute, meridiem)?;

	Some(ClockRef { hour, minute, meridiem, pattern })
}
