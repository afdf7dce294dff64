use std::time::Duration;

use reqwest::Client;

use crate::Result;

/// GETs the configured health path. Without one, the backend is assumed reachable.
pub async fn probe(cfg: &daygrid_config::LlmProviderConfig) -> Result<bool> {
	let Some(path) = cfg.health_path.as_deref() else {
		return Ok(true);
	};
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let res = client
		.get(crate::endpoint(&cfg.api_base, path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.send()
		.await?;

	Ok(res.status().is_success())
}
