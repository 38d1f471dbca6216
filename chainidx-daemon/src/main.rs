use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chainidx_config::{CliOverrides, ExplorerConfig, LogFormat};
use chainidx_core::Network;
use chainidx_datastore::RedisDatastore;
use chainidx_projection::{run_to_completion, FileReplaySource, ProjectionEngine};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "chainidx", version, about = "UTXO chain explorer indexing daemon")]
struct Cli {
    #[arg(long, value_enum)]
    network: Option<CliNetwork>,

    #[arg(long)]
    persistent_directory: Option<PathBuf>,

    #[arg(long)]
    redis_addr: Option<String>,

    #[arg(long)]
    redis_db: Option<i64>,

    #[arg(long)]
    rpc_addr: Option<String>,

    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliNetwork {
    Standard,
    Testnet,
}

impl From<CliNetwork> for Network {
    fn from(n: CliNetwork) -> Self {
        match n {
            CliNetwork::Standard => Network::Standard,
            CliNetwork::Testnet => Network::Testnet,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file and create the persistent directory.
    Init,
    /// Run the projection engine until its consensus source is exhausted
    /// or a shutdown signal arrives.
    Run,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = CliOverrides {
        network: cli.network.map(Into::into),
        persistent_directory: cli.persistent_directory.clone(),
        redis_addr: cli.redis_addr.clone(),
        redis_db: cli.redis_db,
        rpc_addr: cli.rpc_addr.clone(),
    };

    let mut config = ExplorerConfig::load(Some(&cli.config)).context("loading configuration")?;
    config.apply_cli_overrides(overrides);

    match cli.command.unwrap_or(Command::Run) {
        Command::Init => init(&cli.config, &config),
        Command::Run => {
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime.block_on(run(config))
        }
    }
}

fn init(config_path: &PathBuf, config: &ExplorerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.persistent_directory)
        .with_context(|| format!("creating {:?}", config.persistent_directory))?;

    let feed_path = config.persistent_directory.join("changes.jsonl");
    if !feed_path.exists() {
        std::fs::write(&feed_path, b"")
            .with_context(|| format!("creating {feed_path:?}"))?;
        println!("created empty replay feed at {feed_path:?}");
    }

    if config_path.exists() {
        println!("config already exists at {config_path:?}");
        return Ok(());
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, toml::to_string_pretty(config)?)?;
    println!("wrote config to {config_path:?}");
    Ok(())
}

async fn run(config: ExplorerConfig) -> Result<()> {
    init_logging(&config.log.level, config.log.format);
    info!(network = %config.network, chain_name = %config.chain_name, "starting chainidx");

    let store = Arc::new(
        RedisDatastore::connect(&config.datastore.redis_addr, config.datastore.redis_db)
            .await
            .context("connecting to datastore")?,
    );
    let engine = ProjectionEngine::new(store, &config.chain_name, config.network);

    // The consensus engine itself is an external collaborator; this daemon
    // reads from a replay feed dropped into the persistent directory rather
    // than subscribing to a live process.
    let feed_path = config.persistent_directory.join("changes.jsonl");
    let mut source = FileReplaySource::new(feed_path.clone());

    tokio::select! {
        result = run_to_completion(&engine, &mut source) => {
            result.context("projection engine aborted")?;
            info!("consensus source exhausted, exiting");
        }
        _ = shutdown_signal() => {
            warn!("shutdown signal received, unsubscribing");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("installing SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}
