use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = daygrid::Args::parse();

	daygrid::run(args).await
}
