//! HTTP clients for the structured-extraction backend.

pub mod extractor;
pub mod health;

mod error;

pub use error::Error;

use std::{future::Future, pin::Pin};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use daygrid_config::LlmProviderConfig;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The structured-extraction backend as seen by the router.
pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	/// Returns the JSON object recovered from the backend's reply.
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>>;

	fn probe<'a>(&'a self, cfg: &'a LlmProviderConfig) -> BoxFuture<'a, Result<bool>>;
}

/// Talks to an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpExtractor;

impl ExtractorProvider for HttpExtractor {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(extractor::extract(cfg, messages))
	}

	fn probe<'a>(&'a self, cfg: &'a LlmProviderConfig) -> BoxFuture<'a, Result<bool>> {
		Box::pin(health::probe(cfg))
	}
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn endpoint(api_base: &str, path: &str) -> String {
	format!("{}/{}", api_base.trim_end_matches('/'), path.trim_start_matches('/'))
}
