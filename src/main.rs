mod cli;

use clap::Parser;
use cli::{Cli, Commands, CompressArgs};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use smolvid::config::Config;
use smolvid::observability::Metrics;
use smolvid::pipeline::{Capabilities, Pipeline};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;

    match cli.command {
        Commands::Server(args) => smolvid::api::run(config, args.address).await?,
        Commands::Compress(args) => compress_once(config, args).await?,
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

async fn compress_once(config: Config, args: CompressArgs) -> Result<(), AnyError> {
    let capabilities = Capabilities::from_config(&config);
    let pipeline = Pipeline::build(&config, capabilities, Arc::new(Metrics::new()))?;

    let video = pipeline.run(&args.url).await?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&video.file_name));

    tokio::fs::write(&output, &video.bytes).await?;
    info!(
        output = %output.display(),
        bytes = video.bytes.len(),
        bitrate_kbps = video.report.bitrate_kbps,
        "Compressed video written"
    );

    Ok(())
}
