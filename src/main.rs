//! LLAPMesh host
//!
//! Runs a single LLAP node on a serial device or on stdin/stdout.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use llapmesh::config::{self, Config, NodeConfig};
use llapmesh::pool::{self, POOL_SIZE};
use llapmesh::protocol::{FRAME_LEN, FRAME_MARKER};
use llapmesh::{
    Address, AddressStore, Engine, FileStore, StdPlatform, StreamTransport, Transport,
};

/// LLAPMesh - LLAP node host
#[derive(Parser)]
#[command(name = "llapmesh")]
#[command(author = "LLAPMesh Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Run an LLAP mesh node over a serial link", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a node (stdin/stdout unless a device is given)
    Run {
        /// Act as the network coordinator
        #[arg(long)]
        coordinator: bool,

        /// Fixed node address (two letters A-Z)
        #[arg(short, long)]
        address: Option<Address>,

        /// Serial device to use
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// State file
        #[arg(short, long)]
        store: Option<PathBuf>,
    },

    /// Start handing out coordinator addresses from BA again
    ResetPool {
        /// State file
        #[arg(short, long)]
        store: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout may be the link
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    match cli.command {
        Commands::Run {
            coordinator,
            address,
            device,
            store,
        } => {
            config.node.coordinator |= coordinator;
            if address.is_some() {
                config.node.address = address;
            }
            if device.is_some() {
                config.transport.device = device;
            }
            if store.is_some() {
                config.store.path = store;
            }
            run_node(config).await?;
        }
        Commands::ResetPool { store } => {
            if store.is_some() {
                config.store.path = store;
            }
            let mut store = FileStore::open(config.store.resolved_path())?;
            store.reset_pool_counter()?;
            println!("Address pool reset in {}", store.path().display());
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_protocol_info(&config);
        }
    }

    Ok(())
}

/// Run a node until Ctrl+C or the end of input
async fn run_node(config: Config) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();

    let writer: Box<dyn Write + Send> = match &config.transport.device {
        Some(path) => {
            let device = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)?;
            tracing::info!("Using serial device {}", path.display());
            let input = tokio::fs::File::from_std(device.try_clone()?);
            tokio::spawn(read_link(input, tx));
            Box::new(device)
        }
        None => {
            tracing::info!("Using stdin/stdout as the link");
            tokio::spawn(read_link(tokio::io::stdin(), tx));
            Box::new(std::io::stdout())
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut worker = {
        let shutdown = Arc::clone(&shutdown);
        tokio::task::spawn_blocking(move || drive_node(&config, rx, writer, &shutdown))
    };

    tokio::select! {
        result = &mut worker => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
            shutdown.store(true, Ordering::SeqCst);
            worker.await??;
        }
    }

    Ok(())
}

/// Forward bytes from the link to the engine's transport
async fn read_link<R: AsyncRead + Unpin>(mut input: R, tx: mpsc::UnboundedSender<Bytes>) {
    let mut buf = BytesMut::with_capacity(256);
    loop {
        buf.reserve(256);
        match input.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(buf.split().freeze()).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Link read error: {}", e);
                break;
            }
        }
    }
    tracing::debug!("Link reader finished");
}

type HostEngine = Engine<StreamTransport<Box<dyn Write + Send>>, FileStore, StdPlatform>;

/// Blocking node loop. A REBOOT tears the engine down and starts it again
/// from the stored address.
fn drive_node(
    config: &Config,
    rx: mpsc::UnboundedReceiver<Bytes>,
    writer: Box<dyn Write + Send>,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    let store = FileStore::open(config.store.resolved_path())?;
    let poll_interval = Duration::from_millis(config.transport.poll_interval_ms);
    let mut parts = (StreamTransport::new(rx, writer), store, StdPlatform::new());

    loop {
        let (transport, store, platform) = parts;
        let mut engine =
            Engine::with_config(transport, store, platform, config.handshake.engine_config());
        start(&mut engine, &config.node)?;

        loop {
            if shutdown.load(Ordering::SeqCst) {
                log_reader_stats(&engine);
                return Ok(());
            }

            engine.poll()?;
            if let Some(message) = engine.take_message() {
                tracing::info!(
                    "{} from {}: key={} value={}",
                    message.payload,
                    message.remote,
                    message.key(),
                    message.value().unwrap_or_default()
                );
            }

            if engine.platform().take_restart() {
                break;
            }
            if engine.transport_mut().is_exhausted() {
                tracing::info!("Link closed");
                log_reader_stats(&engine);
                return Ok(());
            }
            if engine.transport_mut().bytes_available() < FRAME_LEN {
                std::thread::sleep(poll_interval);
            }
        }

        tracing::info!("Rebooting node");
        parts = engine.into_parts();
    }
}

fn start(engine: &mut HostEngine, node: &NodeConfig) -> anyhow::Result<()> {
    if node.coordinator {
        engine.set_coordinator(true)?;
    }
    match node.address {
        Some(address) if !node.coordinator => engine.begin_with_address(address)?,
        _ => engine.begin()?,
    }
    tracing::info!(
        "Node running as {}{}",
        engine.local_address(),
        if engine.is_coordinator() { " (coordinator)" } else { "" }
    );
    Ok(())
}

fn log_reader_stats(engine: &HostEngine) {
    let stats = engine.reader_stats();
    tracing::info!(
        "Link stats: {} frames, {} desyncs, {} bytes discarded",
        stats.frames,
        stats.desyncs,
        stats.discarded
    );
}

/// Print protocol information
fn print_protocol_info(config: &Config) {
    println!("LLAPMesh Protocol Information");
    println!("=============================\n");

    println!("Frame: {} bytes, marker '{}'", FRAME_LEN, FRAME_MARKER as char);
    println!("Coordinator address: {}", Address::COORDINATOR);
    println!(
        "Address pool: {} addresses, {} to {}",
        POOL_SIZE,
        pool::address_at(0),
        pool::address_at(POOL_SIZE - 1)
    );
    println!("\nState file: {}", config.store.resolved_path().display());
    match &config.transport.device {
        Some(device) => println!("Device: {}", device.display()),
        None => println!("Device: stdin/stdout"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["llapmesh", "info"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_run_parses_address() {
        let cli = Cli::try_parse_from(["llapmesh", "run", "--address", "BC"]).unwrap();
        match cli.command {
            Commands::Run { address, .. } => assert_eq!(address, Some(Address::Node(*b"BC"))),
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_rejects_bad_address() {
        assert!(Cli::try_parse_from(["llapmesh", "run", "--address", "b1"]).is_err());
    }
}
