use std::{
	fs,
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use daygrid_document::{
	DocumentId,
	memory::{self, MemoryStore},
};
use daygrid_domain::{Clock, SystemClock};
use daygrid_service::{DaygridService, VoiceEntry};

#[derive(Debug, Parser)]
#[command(
	version = daygrid_cli::VERSION,
	rename_all = "kebab",
	styles = daygrid_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE", global = true, default_value = "daygrid.toml")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab")]
pub enum Command {
	/// Route one phrase and print the resulting intent as JSON.
	Classify(EntryArgs),
	/// Route one phrase and write it into a JSON document snapshot.
	Place {
		#[command(flatten)]
		entry: EntryArgs,
		#[arg(long, short = 'd', value_name = "FILE")]
		document: PathBuf,
	},
}

#[derive(Debug, clap::Args)]
pub struct EntryArgs {
	#[arg(long, short = 't')]
	pub text: String,
	/// Capture instant; defaults to the current UTC time.
	#[arg(long, value_parser = daygrid_cli::parse_instant)]
	pub now: Option<OffsetDateTime>,
}
impl EntryArgs {
	fn entry(&self) -> VoiceEntry {
		let now = self.now.unwrap_or_else(|| SystemClock::default().now());

		VoiceEntry::new(self.text.as_str(), now)
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = daygrid_config::load(&args.config)?;

	init_tracing(&config);

	let output = match args.command {
		Command::Classify(entry) => classify(config, &entry).await?,
		Command::Place { entry, document } => place(config, &entry, &document).await?,
	};

	println!("{output}");

	Ok(())
}

async fn classify(config: daygrid_config::Config, args: &EntryArgs) -> color_eyre::Result<String> {
	let service = DaygridService::with_http_extractor(config, Arc::new(MemoryStore::new()));
	let routed = service.route(&args.entry()).await;

	Ok(serde_json::to_string_pretty(&routed)?)
}

async fn place(
	config: daygrid_config::Config,
	args: &EntryArgs,
	document: &Path,
) -> color_eyre::Result<String> {
	let doc_id = document_id(document)?;
	let blocks = memory::parse_blocks(&fs::read_to_string(document)?)?;
	let store = Arc::new(MemoryStore::new().with_document(doc_id.clone(), blocks));
	let service = DaygridService::with_http_extractor(config, store.clone());
	let recorded = service.record(&doc_id, &args.entry()).await?;
	let updated = store
		.blocks(&doc_id)
		.ok_or_else(|| eyre::eyre!("Document {doc_id} vanished from the in-memory store."))?;

	fs::write(document, memory::render_blocks(&updated)?)?;
	tracing::info!(path = %document.display(), "Document snapshot updated.");

	Ok(serde_json::to_string_pretty(&recorded)?)
}

fn document_id(path: &Path) -> color_eyre::Result<DocumentId> {
	let stem = path
		.file_stem()
		.and_then(|stem| stem.to_str())
		.ok_or_else(|| eyre::eyre!("Document path {} has no usable file name.", path.display()))?;

	Ok(DocumentId::new(stem))
}

fn init_tracing(config: &daygrid_config::Config) {
	let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
	let filter = EnvFilter::try_new(log_directives(&config.service.log_level, env.as_deref()))
		.unwrap_or_else(|_| EnvFilter::new("info"));

	// Ignored when a subscriber is already installed, as happens across tests.
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init();
}

/// `RUST_LOG`, when set, overrides `service.log_level`.
fn log_directives<'a>(configured: &'a str, env: Option<&'a str>) -> &'a str {
	env.map(str::trim).filter(|value| !value.is_empty()).unwrap_or(configured)
}
