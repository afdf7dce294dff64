//! Fakes and fixtures shared by the integration tests.

use std::{
	collections::VecDeque,
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Value;
use time::OffsetDateTime;

use daygrid_config::{Config, LlmProviderConfig};
use daygrid_document::{
	BoxFuture, DocumentId, DocumentStore, Error as DocumentError, Op, Result as DocumentResult,
	Structure,
	memory::{Block, MemoryStore},
};
use daygrid_domain::Clock;
use daygrid_providers::{Error as ProviderError, ExtractorProvider, Result as ProviderResult};

const TEST_CONFIG: &str = r#"
[service]
log_level = "debug"

[providers.llm_extractor]
provider_id = "scripted"
api_base    = "http://127.0.0.1:9"
api_key     = "test-key"
path        = "/v1/chat/completions"
model       = "scripted"
temperature = 0.0
timeout_ms  = 1000

[routing]
fast_path_threshold   = 0.8
extraction_timeout_ms = 200
health_cache_ttl_ms   = 30000

[template]
slot_minutes = 30
description  = "Two-column planner with To-Do, Journal and Notes sections."
"#;

pub fn test_config() -> Config {
	daygrid_config::load_str(TEST_CONFIG).expect("Test config must be valid.")
}

pub struct FixedClock {
	now: Mutex<OffsetDateTime>,
}
impl FixedClock {
	pub fn new(now: OffsetDateTime) -> Self {
		Self { now: Mutex::new(now) }
	}

	pub fn set(&self, now: OffsetDateTime) {
		*self.now.lock().unwrap_or_else(|err| err.into_inner()) = now;
	}

	pub fn advance(&self, by: time::Duration) {
		let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());

		*now += by;
	}
}
impl Clock for FixedClock {
	fn now(&self) -> OffsetDateTime {
		*self.now.lock().unwrap_or_else(|err| err.into_inner())
	}
}

pub enum Reply {
	Json(Value),
	Fail(String),
	/// Answers only after the delay, to exercise the router deadline.
	Slow(Duration, Value),
}

/// Extractor that replays scripted replies and counts how often it was asked.
pub struct ScriptedExtractor {
	replies: Mutex<VecDeque<Reply>>,
	backend_up: AtomicBool,
	extract_calls: AtomicUsize,
	probe_calls: AtomicUsize,
	probe_delay_ms: AtomicU64,
	last_messages: Mutex<Vec<Value>>,
}
impl ScriptedExtractor {
	pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
		Self {
			replies: Mutex::new(replies.into_iter().collect()),
			backend_up: AtomicBool::new(true),
			extract_calls: AtomicUsize::new(0),
			probe_calls: AtomicUsize::new(0),
			probe_delay_ms: AtomicU64::new(0),
			last_messages: Mutex::new(Vec::new()),
		}
	}

	/// A backend that must never be reached.
	pub fn unused() -> Self {
		Self::new([])
	}

	/// Wraps `content` the way a chat completions backend would before recovery.
	pub fn content(content: &str) -> Reply {
		match daygrid_providers::extractor::parse_content(content) {
			Ok(value) => Reply::Json(value),
			Err(err) => Reply::Fail(err.to_string()),
		}
	}

	pub fn set_backend_up(&self, up: bool) {
		self.backend_up.store(up, Ordering::SeqCst);
	}

	/// Makes every health check take `delay` before answering.
	pub fn set_probe_delay(&self, delay: Duration) {
		let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);

		self.probe_delay_ms.store(millis, Ordering::SeqCst);
	}

	pub fn extract_calls(&self) -> usize {
		self.extract_calls.load(Ordering::SeqCst)
	}

	pub fn probe_calls(&self) -> usize {
		self.probe_calls.load(Ordering::SeqCst)
	}

	pub fn last_messages(&self) -> Vec<Value> {
		self.last_messages.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl ExtractorProvider for ScriptedExtractor {
	fn extract<'a>(
		&'a self,
		_: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, ProviderResult<Value>> {
		self.extract_calls.fetch_add(1, Ordering::SeqCst);
		*self.last_messages.lock().unwrap_or_else(|err| err.into_inner()) = messages.to_vec();

		let reply = self.replies.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

		Box::pin(async move {
			match reply {
				Some(Reply::Json(value)) => Ok(value),
				Some(Reply::Slow(delay, value)) => {
					tokio::time::sleep(delay).await;

					Ok(value)
				},
				Some(Reply::Fail(message)) => Err(ProviderError::InvalidResponse { message }),
				None => Err(ProviderError::InvalidResponse {
					message: "No scripted reply.".to_string(),
				}),
			}
		})
	}

	fn probe<'a>(&'a self, _: &'a LlmProviderConfig) -> BoxFuture<'a, ProviderResult<bool>> {
		self.probe_calls.fetch_add(1, Ordering::SeqCst);

		let up = self.backend_up.load(Ordering::SeqCst);
		let delay = Duration::from_millis(self.probe_delay_ms.load(Ordering::SeqCst));

		Box::pin(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}

			Ok(up)
		})
	}
}

/// Memory store that refuses selected mutations.
pub struct RejectingStore {
	inner: MemoryStore,
	reject_structural: bool,
	reject_all: bool,
}
impl RejectingStore {
	/// Refuses any batch containing a row insertion.
	pub fn structural(inner: MemoryStore) -> Self {
		Self { inner, reject_structural: true, reject_all: false }
	}

	pub fn all(inner: MemoryStore) -> Self {
		Self { inner, reject_structural: false, reject_all: true }
	}

	pub fn inner(&self) -> &MemoryStore {
		&self.inner
	}
}
impl DocumentStore for RejectingStore {
	fn structure<'a>(&'a self, doc_id: &'a DocumentId) -> BoxFuture<'a, DocumentResult<Structure>> {
		self.inner.structure(doc_id)
	}

	fn mutate<'a>(
		&'a self,
		doc_id: &'a DocumentId,
		ops: Vec<Op>,
	) -> BoxFuture<'a, DocumentResult<()>> {
		if self.reject_all || (self.reject_structural && ops.iter().any(Op::is_structural)) {
			return Box::pin(async {
				Err(DocumentError::Rejected("Mutation refused by test store.".to_string()))
			});
		}

		self.inner.mutate(doc_id, ops)
	}
}

pub fn doc_id() -> DocumentId {
	DocumentId::new("2024-01-15")
}

/// A planner page: title, a `Time | Activity` grid with `rows`, then the free-text sections.
pub fn planner(rows: &[(&str, &str)]) -> Vec<Block> {
	let mut grid = vec![vec!["Time".to_string(), "Activity".to_string()]];

	grid.extend(rows.iter().map(|(label, content)| vec![label.to_string(), content.to_string()]));

	vec![
		Block::Paragraph("Monday, January 15".to_string()),
		Block::Table(grid),
		Block::Paragraph("To-Do".to_string()),
		Block::Paragraph(String::new()),
		Block::Paragraph("Journal".to_string()),
		Block::Paragraph(String::new()),
		Block::Paragraph("Notes".to_string()),
		Block::Paragraph(String::new()),
	]
}

/// Half-hour rows from `from_hour` up to, not including, `to_hour`, all empty.
pub fn half_hour_rows(from_hour: u16, to_hour: u16) -> Vec<String> {
	(from_hour * 2..to_hour * 2)
		.map(|half| daygrid_domain::SlotRange::floor_at(half * 30, 30).label())
		.collect()
}

pub fn planner_with_labels(labels: &[String]) -> Vec<Block> {
	let rows: Vec<(&str, &str)> = labels.iter().map(|label| (label.as_str(), "")).collect();

	planner(&rows)
}

/// Second-column text of the first grid row whose label is `label`.
pub fn cell_text(blocks: &[Block], label: &str) -> Option<String> {
	blocks.iter().find_map(|block| match block {
		Block::Table(rows) => rows
			.iter()
			.find(|row| row.first().is_some_and(|cell| cell == label))
			.and_then(|row| row.get(1).cloned()),
		Block::Paragraph(_) => None,
	})
}

/// Grid row labels in document order.
pub fn row_labels(blocks: &[Block]) -> Vec<String> {
	blocks
		.iter()
		.find_map(|block| match block {
			Block::Table(rows) =>
				Some(rows.iter().filter_map(|row| row.first().cloned()).collect::<Vec<_>>()),
			Block::Paragraph(_) => None,
		})
		.unwrap_or_default()
}

pub fn paragraphs(blocks: &[Block]) -> Vec<String> {
	blocks
		.iter()
		.filter_map(|block| match block {
			Block::Paragraph(text) => Some(text.clone()),
			Block::Table(_) => None,
		})
		.collect()
}
