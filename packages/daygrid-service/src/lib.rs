//! Routes voice entries to typed intents and writes them into the day's document.

pub mod daily;
pub mod dispatch;
pub mod extraction;
pub mod placement;
pub mod router;

mod error;

pub use daily::{CarriedReminder, CarryForwardReport};
pub use dispatch::{ActionOutcome, Recorded};
pub use error::{Error, Result};
pub use extraction::CachedProbe;
pub use placement::{Placement, PlacementEngine};
pub use router::{RoutePath, Routed};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use daygrid_config::Config;
use daygrid_document::DocumentStore;
use daygrid_domain::{Clock, FastPathClassifier, SystemClock};
use daygrid_providers::{ExtractorProvider, HttpExtractor};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub lat: f64,
	pub lng: f64,
}

/// One spoken phrase, stamped with the local instant it was captured.
#[derive(Clone, Debug)]
pub struct VoiceEntry {
	pub text: String,
	pub occurred_at: OffsetDateTime,
	pub geo: Option<GeoPoint>,
}
impl VoiceEntry {
	pub fn new(text: impl Into<String>, occurred_at: OffsetDateTime) -> Self {
		Self { text: text.into(), occurred_at, geo: None }
	}

	pub fn with_geo(mut self, geo: GeoPoint) -> Self {
		self.geo = Some(geo);

		self
	}
}

pub struct DaygridService {
	pub cfg: Config,
	pub store: Arc<dyn DocumentStore>,
	pub extractor: Arc<dyn ExtractorProvider>,
	pub clock: Arc<dyn Clock>,
	classifier: FastPathClassifier,
	probe: CachedProbe,
}
impl DaygridService {
	pub fn new(
		cfg: Config,
		store: Arc<dyn DocumentStore>,
		extractor: Arc<dyn ExtractorProvider>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let classifier = FastPathClassifier::new(cfg.template.slot_minutes);
		let probe = CachedProbe::new(cfg.routing.health_cache_ttl_ms);

		Self { cfg, store, extractor, clock, classifier, probe }
	}

	/// Service wired to the configured HTTP backend and the wall clock.
	pub fn with_http_extractor(cfg: Config, store: Arc<dyn DocumentStore>) -> Self {
		Self::new(cfg, store, Arc::new(HttpExtractor), Arc::new(SystemClock::default()))
	}

	pub fn placement(&self) -> PlacementEngine<'_> {
		PlacementEngine::new(self.store.as_ref(), self.cfg.template.slot_minutes)
	}
}
