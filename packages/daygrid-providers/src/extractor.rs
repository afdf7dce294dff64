use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 2;

/// Sends one chat completion and returns the first JSON object found in the reply.
///
/// A reply without a usable object is retried once; transport errors are not.
pub async fn extract(cfg: &daygrid_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let mut last_error = None;

	for attempt in 1..=MAX_ATTEMPTS {
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		match parse_extractor_json(json) {
			Ok(parsed) => return Ok(parsed),
			Err(err) => {
				tracing::debug!(attempt, error = %err, "Extractor reply carried no usable object.");

				last_error = Some(err);
			},
		}
	}

	Err(last_error.unwrap_or_else(|| Error::InvalidResponse {
		message: "Extractor returned no reply.".to_string(),
	}))
}

/// Unwraps a chat-completions envelope; a bare object is accepted as the payload itself.
pub fn parse_extractor_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		return parse_content(content);
	}

	if json.is_object() && json.get("choices").is_none() {
		return Ok(json);
	}

	Err(Error::InvalidResponse { message: "Extractor response is missing content.".to_string() })
}

/// Parses the first balanced object out of free-form model output.
pub fn parse_content(content: &str) -> Result<Value> {
	let Some(raw) = recover_json_object(content) else {
		return Err(Error::InvalidResponse {
			message: "Extractor content has no balanced JSON object.".to_string(),
		});
	};
	let parsed: Value = serde_json::from_str(raw)?;

	Ok(parsed)
}

/// Returns the first balanced `{...}` span. Braces inside string literals do not count.
pub fn recover_json_object(text: &str) -> Option<&str> {
	let start = text.find('{')?;
	let mut depth = 0_usize;
	let mut in_string = false;
	let mut escaped = false;

	for (index, ch) in text[start..].char_indices() {
		if in_string {
			match ch {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				'"' => in_string = false,
				_ => {},
			}

			continue;
		}

		match ch {
			'"' => in_string = true,
			'{' => depth += 1,
			'}' => {
				depth -= 1;

				if depth == 0 {
					return Some(&text[start..=start + index]);
				}
			},
			_ => {},
		}
	}

	None
}
