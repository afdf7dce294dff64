use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::clock::Meridiem;

pub const MINUTES_PER_DAY: u16 = 1_440;

static RANGE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^\s*(\d{1,2})(?::([0-5]\d))?\s*(a\.?m\.?|p\.?m\.?)?\s*(?:-|–|—|to)\s*(\d{1,2})(?::([0-5]\d))?\s*(a\.?m\.?|p\.?m\.?)?\s*$",
	)
	.expect("range label pattern is valid")
});
static SINGLE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^\s*(\d{1,2})(?::([0-5]\d))?\s*(a\.?m\.?|p\.?m\.?)?\s*$")
		.expect("single label pattern is valid")
});

/// Half-open interval of minutes since local midnight. A range that crosses midnight keeps
/// counting past 1440 instead of wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SlotRange {
	start_minute: u16,
	end_minute: u16,
}
impl SlotRange {
	pub fn new(start_minute: u16, end_minute: u16) -> Option<Self> {
		if start_minute >= MINUTES_PER_DAY
			|| end_minute <= start_minute
			|| end_minute - start_minute > MINUTES_PER_DAY
		{
			return None;
		}

		Some(Self { start_minute, end_minute })
	}

	/// The slot of `width` minutes that encloses `minute`, always rounded down.
	pub fn floor_at(minute: u16, width: u16) -> Self {
		let width = width.clamp(1, MINUTES_PER_DAY);
		let minute = minute % MINUTES_PER_DAY;
		let start_minute = minute - minute % width;

		Self { start_minute, end_minute: start_minute + width }
	}

	pub fn start_minute(&self) -> u16 {
		self.start_minute
	}

	pub fn end_minute(&self) -> u16 {
		self.end_minute
	}

	pub fn width(&self) -> u16 {
		self.end_minute - self.start_minute
	}

	pub fn contains(&self, minute: u16) -> bool {
		self.start_minute <= minute && minute < self.end_minute
	}

	pub fn start_time(&self) -> time::Time {
		let minute = self.start_minute % MINUTES_PER_DAY;

		time::Time::from_hms((minute / 60) as u8, (minute % 60) as u8, 0)
			.unwrap_or(time::Time::MIDNIGHT)
	}

	/// The slot moved by `minutes`, or `None` when the result would start outside the day.
	pub fn shifted(&self, minutes: i32) -> Option<Self> {
		let start = i32::from(self.start_minute) + minutes;
		let end = i32::from(self.end_minute) + minutes;

		if start < 0 || end < 0 {
			return None;
		}

		Self::new(u16::try_from(start).ok()?, u16::try_from(end).ok()?)
	}

	/// Canonical row label, e.g. `4:30 PM – 5:00 PM`.
	pub fn label(&self) -> String {
		format!("{} – {}", format_clock(self.start_minute), format_clock(self.end_minute))
	}

	/// Parses a grid row label such as `12:00–2:00 PM`, `9 AM - 10 AM` or `13:00 to 13:30`.
	pub fn parse_label(text: &str) -> Option<Self> {
		let caps = RANGE_LABEL.captures(text)?;
		let start_meridiem = caps.get(3).map(|m| Meridiem::from_suffix(m.as_str()));
		let end_meridiem = caps.get(6).map(|m| Meridiem::from_suffix(m.as_str()));
		let end_minute = label_minute(&caps, 4, 5, end_meridiem)?;
		let start_minute = match (start_meridiem, end_meridiem) {
			(None, Some(shared)) => {
				let same = label_minute(&caps, 1, 2, Some(shared))?;

				// "11–1 PM" means 11 AM; borrowing the end meridiem would invert the range.
				if same > end_minute {
					label_minute(&caps, 1, 2, Some(shared.flip()))?
				} else {
					same
				}
			},
			(own, _) => label_minute(&caps, 1, 2, own)?,
		};
		let end_minute =
			if end_minute <= start_minute { end_minute + MINUTES_PER_DAY } else { end_minute };

		Self::new(start_minute, end_minute)
	}

	/// Like [`SlotRange::parse_label`], but also accepts a lone clock time and gives it `width`.
	pub fn parse_label_with_width(text: &str, width: u16) -> Option<Self> {
		if let Some(range) = Self::parse_label(text) {
			return Some(range);
		}

		let caps = SINGLE_LABEL.captures(text)?;
		let meridiem = caps.get(3).map(|m| Meridiem::from_suffix(m.as_str()));
		let start = label_minute(&caps, 1, 2, meridiem)?;

		Self::new(start, start + width.max(1))
	}
}

/// Renders a minute of the day as a 12-hour clock, e.g. `4:30 PM`.
pub fn format_clock(minute: u16) -> String {
	let minute = minute % MINUTES_PER_DAY;
	let hour = minute / 60;
	let (display_hour, suffix) = match hour {
		0 => (12, "AM"),
		1..=11 => (hour, "AM"),
		12 => (12, "PM"),
		_ => (hour - 12, "PM"),
	};

	format!("{display_hour}:{:02} {suffix}", minute % 60)
}

/// Loose textual key for comparing labels: case, whitespace, dots and dash style are ignored.
pub fn label_key(text: &str) -> String {
	text.chars()
		.filter(|ch| !ch.is_whitespace() && *ch != '.')
		.map(|ch| match ch {
			'–' | '—' => '-',
			other => other.to_ascii_lowercase(),
		})
		.collect()
}

/// Converts an hour and minute with an optional meridiem into a minute of the day.
pub fn clock_minute(hour: u8, minute: u8, meridiem: Option<Meridiem>) -> Option<u16> {
	if minute >= 60 {
		return None;
	}

	let hour24 = match meridiem {
		Some(meridiem) => {
			if !(1..=12).contains(&hour) {
				return None;
			}

			meridiem.to_24h(hour)
		},
		None => {
			if hour > 23 {
				return None;
			}

			hour
		},
	};

	Some(u16::from(hour24) * 60 + u16::from(minute))
}

fn label_minute(
	caps: &Captures<'_>,
	hour_group: usize,
	minute_group: usize,
	meridiem: Option<Meridiem>,
) -> Option<u16> {
	let hour: u8 = caps.get(hour_group)?.as_str().parse().ok()?;
	let minute: u8 = match caps.get(minute_group) {
		Some(m) => m.as_str().parse().ok()?,
		None => 0,
	};

	clock_minute(hour, minute, meridiem)
}
