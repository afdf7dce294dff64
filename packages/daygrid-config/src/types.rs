use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub routing: Routing,
	#[serde(default)]
	pub template: Template,
	#[serde(default)]
	pub reminders: Reminders,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub llm_extractor: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Optional. Relative path probed with a GET to decide whether the backend is reachable.
	/// When absent the backend is assumed to be up.
	#[serde(default)]
	pub health_path: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Routing {
	/// Minimum fast-path confidence that skips the extraction backend.
	pub fast_path_threshold: f32,
	/// Hard deadline for one extraction call, measured by the router.
	pub extraction_timeout_ms: u64,
	pub health_cache_ttl_ms: u64,
}
impl Default for Routing {
	fn default() -> Self {
		Self {
			fast_path_threshold: 0.8,
			extraction_timeout_ms: 20_000,
			health_cache_ttl_ms: 30_000,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Template {
	/// Width of one grid row. The canonical templates use 30 or 60.
	pub slot_minutes: u16,
	/// Free-text description of the daily template, forwarded to the extraction backend.
	pub description: Option<String>,
	pub sections: TemplateSections,
}
impl Default for Template {
	fn default() -> Self {
		Self { slot_minutes: 30, description: None, sections: TemplateSections::default() }
	}
}

/// Heading texts that open each free-text section, matched case-insensitively.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TemplateSections {
	pub todo: Vec<String>,
	pub journal: Vec<String>,
	pub notes: Vec<String>,
}
impl Default for TemplateSections {
	fn default() -> Self {
		Self {
			todo: vec!["To-Do".to_string(), "ToDo".to_string(), "Tasks".to_string()],
			journal: vec!["Journal".to_string()],
			notes: vec!["Notes".to_string()],
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Reminders {
	/// Number of prior daily documents scanned for reminder tags when a new day is built.
	pub lookback_days: u32,
}
impl Default for Reminders {
	fn default() -> Self {
		Self { lookback_days: 7 }
	}
}
