use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mirror_cli::{
    commands::index::{IndexOptions, index},
    config::{DEFAULT_CONFIG_PATH, Overrides, load_config_or_default, resolve},
};

#[derive(Debug, Parser)]
#[command(name = "mirror-cli", about = "Continuous clearing auction indexer", version)]
struct Cli {
    /// Path to the indexer configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: PathBuf,

    /// RPC URL for the target chain (http, ws or ipc)
    #[arg(long, env = "CCA_RPC_URL", value_name = "URL")]
    rpc_url: Option<String>,

    /// Address of the auction factory to follow
    #[arg(long, env = "CCA_FACTORY_ADDRESS", value_name = "ADDRESS")]
    factory: Option<Address>,

    /// Tracing filter, e.g. `info,mirror_core=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info", value_name = "FILTER")]
    log_filter: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay factory and auction events, then print the indexed state
    Index(IndexArgs),
}

#[derive(Debug, Args)]
struct IndexArgs {
    /// First block to scan (defaults to the factory start block in config)
    #[arg(long, value_name = "BLOCK")]
    from_block: Option<u64>,

    /// Stop after this block instead of following new heads
    #[arg(long, value_name = "BLOCK", conflicts_with = "once")]
    until_block: Option<u64>,

    /// Stop at the current chain head
    #[arg(long)]
    once: bool,

    /// Print a single auction with its bids, ticks and checkpoints
    #[arg(long, value_name = "ADDRESS")]
    auction: Option<Address>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_filter)?)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config_or_default(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Index(args) => {
            let overrides = Overrides {
                rpc_url: cli.rpc_url,
                factory: cli.factory,
                start_block: args.from_block,
            };
            let settings = resolve(config, overrides)?;
            let options = IndexOptions {
                until_block: args.until_block,
                once: args.once,
                auction: args.auction,
            };

            let output = index(&settings, options).await?;
            println!("{output}");
        }
    }

    Ok(())
}
