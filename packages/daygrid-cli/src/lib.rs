//! Pieces shared by every daygrid binary: version string, help styling and argument parsers.

use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub const VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"-",
	env!("VERGEN_GIT_SHA"),
	"-",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.literal(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
}

/// `--now` values: RFC 3339 with an explicit offset, e.g. `2024-01-15T10:30:00+01:00`.
pub fn parse_instant(raw: &str) -> Result<OffsetDateTime, String> {
	OffsetDateTime::parse(raw.trim(), &Rfc3339)
		.map_err(|err| format!("expected an RFC 3339 timestamp with offset: {err}"))
}
