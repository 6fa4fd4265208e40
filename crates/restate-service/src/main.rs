use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use restate_config::ConfigLoader;
use restate_core::{RestateConfig, SnapshotStore};
use restate_storage::StorageBackend;
use restate_types::{RestateSettings, PERSIST_KEY};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "restate")]
#[command(about = "Inspect and manage persisted store state", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Configuration file; defaults apply when omitted
	#[arg(short, long, value_name = "FILE")]
	config: Option<PathBuf>,

	#[arg(long, env = "RESTATE_LOG_LEVEL")]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the persisted snapshot
	Inspect {
		/// Only show these slices (comma separated)
		#[arg(long, value_delimiter = ',')]
		states: Option<Vec<String>>,
	},
	/// Remove the persisted snapshot
	Clear,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let settings = load_settings(&cli).await?;

	let log_level = cli
		.log_level
		.clone()
		.unwrap_or_else(|| settings.restate.log_level.clone());
	setup_tracing(&log_level)?;

	match &cli.command {
		Some(Commands::Inspect { states }) => inspect(&settings, states.clone()).await,
		None => inspect(&settings, None).await,
		Some(Commands::Clear) => clear(&settings).await,
		Some(Commands::Validate) => validate(&cli, &settings),
	}
}

async fn load_settings(cli: &Cli) -> Result<RestateSettings> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = &cli.config {
		loader = loader.with_file(path);
	}

	loader.load().await.context("Failed to load configuration")
}

async fn inspect(settings: &RestateSettings, states: Option<Vec<String>>) -> Result<()> {
	let mut config = RestateConfig::from_settings(settings);
	if states.is_some() {
		config.states = states;
	}

	let store = SnapshotStore::from_config(&config);
	if !store
		.exists()
		.await
		.context("Failed to query persisted state")?
	{
		info!("No persisted state under {}", PERSIST_KEY);
		return Ok(());
	}

	match store
		.load_value()
		.await
		.context("Failed to read persisted state")?
	{
		Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
		None => info!("No persisted state under {}", PERSIST_KEY),
	}

	Ok(())
}

async fn clear(settings: &RestateSettings) -> Result<()> {
	let store = SnapshotStore::from_config(&RestateConfig::from_settings(settings));
	if !store
		.exists()
		.await
		.context("Failed to query persisted state")?
	{
		info!("Nothing to clear under {}", PERSIST_KEY);
		return Ok(());
	}

	store
		.clear()
		.await
		.context("Failed to clear persisted state")?;

	info!("Cleared persisted state under {}", PERSIST_KEY);
	Ok(())
}

fn validate(cli: &Cli, settings: &RestateSettings) -> Result<()> {
	match &cli.config {
		Some(path) => info!("Configuration file {:?} is valid", path),
		None => info!("No configuration file given, defaults are valid"),
	}

	info!("Save delay: {}ms", settings.restate.delay_ms);
	match &settings.restate.states {
		Some(states) => info!("Restored slices: {}", states.join(", ")),
		None => info!("Restored slices: all"),
	}

	match StorageBackend::from_settings(&settings.storage) {
		Some(StorageBackend::File { path }) => info!("Storage: file ({:?})", path),
		Some(StorageBackend::Memory) => info!("Storage: memory (not persisted across runs)"),
		None => info!("Storage: disabled"),
	}

	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}
