mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, LlmProviderConfig, Providers, Reminders, Routing, Service, Template, TemplateSections,
};

use std::{fs, path::Path};

pub const MAX_LOOKBACK_DAYS: u32 = 31;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn load_str(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw).map_err(|err| Error::ParseInline { source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	let extractor = &cfg.providers.llm_extractor;

	for (label, value) in [
		("providers.llm_extractor.provider_id", &extractor.provider_id),
		("providers.llm_extractor.api_base", &extractor.api_base),
		("providers.llm_extractor.api_key", &extractor.api_key),
		("providers.llm_extractor.model", &extractor.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if extractor.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm_extractor.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !extractor.temperature.is_finite() || extractor.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm_extractor.temperature must be a finite number of zero or greater."
				.to_string(),
		});
	}
	if extractor.default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: "providers.llm_extractor.default_headers values must be strings.".to_string(),
		});
	}
	if !cfg.routing.fast_path_threshold.is_finite() {
		return Err(Error::Validation {
			message: "routing.fast_path_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.routing.fast_path_threshold) {
		return Err(Error::Validation {
			message: "routing.fast_path_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.routing.extraction_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "routing.extraction_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.template.slot_minutes, 30 | 60) {
		return Err(Error::Validation {
			message: "template.slot_minutes must be 30 or 60.".to_string(),
		});
	}

	for (label, names) in [
		("template.sections.todo", &cfg.template.sections.todo),
		("template.sections.journal", &cfg.template.sections.journal),
		("template.sections.notes", &cfg.template.sections.notes),
	] {
		if names.is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
		if names.iter().any(|name| name.trim().is_empty()) {
			return Err(Error::Validation {
				message: format!("{label} must not contain empty headings."),
			});
		}
	}

	if cfg.reminders.lookback_days == 0 || cfg.reminders.lookback_days > MAX_LOOKBACK_DAYS {
		return Err(Error::Validation {
			message: format!("reminders.lookback_days must be in the range 1-{MAX_LOOKBACK_DAYS}."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.template.description.as_deref().map(|text| text.trim().is_empty()).unwrap_or(false) {
		cfg.template.description = None;
	}
	if cfg
		.providers
		.llm_extractor
		.health_path
		.as_deref()
		.map(|path| path.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.llm_extractor.health_path = None;
	}

	for names in [
		&mut cfg.template.sections.todo,
		&mut cfg.template.sections.journal,
		&mut cfg.template.sections.notes,
	] {
		for name in names.iter_mut() {
			*name = name.trim().to_string();
		}
	}
}
