//! peersync - Two-node directory mirroring over a peer link
//!
//! Watches a directory tree and pushes every local change to a peer node,
//! while a local listener applies the peer's changes in return. Both sides
//! run the same binary; there is no central coordinator.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use peersync_config::{Config, ConfigLoader};
use peersync_engine::{ChangePropagationEngine, EngineConfig, FsWatcher};
use peersync_net::{ReceiverConfig, SyncReceiver, SyncSender};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};

/// peersync - Two-node directory mirroring over a peer link
#[derive(Parser)]
#[command(
    name = "peersync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Two-node directory mirroring over a peer link",
    long_about = "peersync keeps two directory trees on separate hosts mirrored.\n\
                  Local filesystem changes are pushed to the peer as they happen,\n\
                  and inbound changes from the peer are applied without echoing\n\
                  them back."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror a directory with a peer node
    Run {
        /// Directory to keep in sync
        root: PathBuf,
        /// Local listener address, e.g. 0.0.0.0:9345
        #[arg(short, long)]
        listen: Option<String>,
        /// Peer listener address, e.g. 192.168.1.20:9345
        #[arg(short, long)]
        peer: Option<String>,
    },
    /// Show the effective configuration or generate a default file
    Config {
        /// Write a default configuration file to this path
        #[arg(long)]
        generate: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load_default()?,
    };

    init_logging(&config, cli.debug, cli.quiet, cli.verbose)?;

    match cli.command {
        Commands::Run { root, listen, peer } => {
            run_command(config, root, listen, peer).await?;
        }
        Commands::Config { generate } => {
            config_command(&config, generate)?;
        }
    }

    Ok(())
}

fn init_logging(config: &Config, debug: bool, quiet: bool, verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_ansi(config.logging.colored_output)
        .with_target(false)
        .init();

    Ok(())
}

async fn run_command(
    mut config: Config,
    root: PathBuf,
    listen: Option<String>,
    peer: Option<String>,
) -> Result<()> {
    if let Some(listen) = listen {
        config.network.listen_addr = listen;
    }
    if let Some(peer) = peer {
        config.network.peer_addr = peer;
    }
    config.validate()?;

    let root = root.canonicalize()?;
    let bind_addr: SocketAddr = config.network.listen_addr.parse()?;

    info!("peersync v{} starting", env!("CARGO_PKG_VERSION"));
    println!(
        "{} Mirroring {} with peer {}",
        style("⟲").blue().bold(),
        style(root.display()).cyan(),
        style(&config.network.peer_addr).cyan()
    );

    let mut receiver_config = ReceiverConfig::new(bind_addr, &root);
    receiver_config.settle_delay = config.sync.settle_delay;
    receiver_config.chunk_size = config.sync.chunk_size;
    receiver_config.marker_dir = config.sync.marker_dir.clone();

    let mut receiver = SyncReceiver::new(receiver_config);
    tokio::spawn(async move {
        if let Err(e) = receiver.start().await {
            error!("receiver terminated: {}", e);
        }
    });

    let sender = SyncSender::new(&root, config.network.peer_addr.clone())
        .with_chunk_size(config.sync.chunk_size);
    let engine_config = EngineConfig {
        debounce_window: config.sync.debounce_window,
        settle_delay: config.sync.settle_delay,
        marker_dir: config.sync.marker_dir.clone(),
    };

    let mut engine = ChangePropagationEngine::new(&root, sender, engine_config)?;
    let mut watcher = FsWatcher::new(&root)?;

    engine.run(&mut watcher).await;
    Ok(())
}

fn config_command(config: &Config, generate: Option<PathBuf>) -> Result<()> {
    match generate {
        Some(path) => {
            ConfigLoader::generate_default_config(&path)?;
            println!(
                "{} Wrote default configuration to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => {
            println!("{}", serde_yaml::to_string(config)?);
        }
    }
    Ok(())
}
