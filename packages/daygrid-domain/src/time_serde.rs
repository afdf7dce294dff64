//! Human-readable serializers for calendar dates (`2024-01-16`) and clock times (`09:00`).

pub mod date {
	use serde::Serializer;
	use time::{Date, macros::format_description};

	pub fn serialize<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let formatted = value
			.format(format_description!("[year]-[month]-[day]"))
			.map_err(serde::ser::Error::custom)?;

		serializer.serialize_str(&formatted)
	}
}

pub mod clock {
	use serde::Serializer;
	use time::{Time, macros::format_description};

	pub fn serialize<S>(value: &Time, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let formatted = value
			.format(format_description!("[hour]:[minute]"))
			.map_err(serde::ser::Error::custom)?;

		serializer.serialize_str(&formatted)
	}
}
