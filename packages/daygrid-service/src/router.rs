use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::time::Instant;

use daygrid_domain::{Intent, Resolved, temporal};

use crate::{DaygridService, Error, Result, VoiceEntry, extraction};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePath {
	FastPath,
	Extraction,
	/// The backend was skipped or failed; the fast-path intent was used anyway.
	Fallback,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Routed {
	pub intent: Intent,
	pub path: RoutePath,
	pub deferred: bool,
}

impl DaygridService {
	/// Classifies an entry, consulting the backend only when the fast path is unsure.
	///
	/// Never fails: every backend problem degrades to the fast-path intent.
	pub async fn route(&self, entry: &VoiceEntry) -> Routed {
		let fast = self.classifier.classify(&entry.text, entry.occurred_at);
		let timeout_ms = self.cfg.routing.extraction_timeout_ms;
		let deadline = Instant::now() + Duration::from_millis(timeout_ms);
		let (intent, path) = if self.trusts_fast_path(&fast) {
			tracing::info!(confidence = fast.confidence, "Fast path accepted.");

			(fast, RoutePath::FastPath)
		} else if !self.backend_available(deadline).await {
			tracing::warn!(
				confidence = fast.confidence,
				"Extraction backend is down. Using the fast path result."
			);

			(fast, RoutePath::Fallback)
		} else {
			match self.extract_with_deadline(entry, deadline).await {
				Ok(intent) => {
					tracing::info!(confidence = intent.confidence, "Extraction accepted.");

					(intent, RoutePath::Extraction)
				},
				Err(err) => {
					tracing::warn!(error = %err, "Extraction failed. Using the fast path result.");

					(fast, RoutePath::Fallback)
				},
			}
		};
		let Resolved { intent, deferred } = temporal::resolve(intent, entry.occurred_at);

		if deferred {
			tracing::info!("Explicit time already passed. Deferred to tomorrow.");
		}

		Routed { intent, path, deferred }
	}

	fn trusts_fast_path(&self, fast: &Intent) -> bool {
		fast.confidence >= self.cfg.routing.fast_path_threshold || fast.is_complete_reminder()
	}

	/// Runs one extraction on its own task and stops waiting at `deadline`, which also covered
	/// the health probe. A late call is left running and its answer discarded.
	async fn extract_with_deadline(
		&self,
		entry: &VoiceEntry,
		deadline: Instant,
	) -> Result<Intent> {
		let messages = extraction::build_messages(entry, &self.cfg.template)?;
		let extractor = Arc::clone(&self.extractor);
		let cfg = self.cfg.providers.llm_extractor.clone();
		let timeout_ms = self.cfg.routing.extraction_timeout_ms;
		let call = tokio::spawn(async move { extractor.extract(&cfg, &messages).await });
		let raw = match tokio::time::timeout_at(deadline, call).await {
			Ok(Ok(result)) => result?,
			Ok(Err(err)) =>
				return Err(Error::Provider { message: format!("Extraction task failed: {err}.") }),
			Err(_) => return Err(Error::Timeout { timeout_ms }),
		};

		extraction::normalize(raw, entry, self.cfg.template.slot_minutes)
	}
}
