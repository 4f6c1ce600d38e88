//! Fairway Lobby Server
//!
//! Hosts one lobby of up to 8 connections plus the voice relay.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fairway_protocol::{create_channel_configs, create_voice_channel_configs, PROTOCOL_ID};
use fairway_server::{RenetHost, Server, ServerConfig, TransportConfig};

#[derive(Parser)]
#[command(name = "fairway-server")]
#[command(about = "Authoritative lobby server and voice relay", version)]
struct Cli {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the lobby port
    #[arg(long)]
    port: Option<u16>,

    /// Override the voice relay port
    #[arg(long)]
    voice_port: Option<u16>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "fairway_server=debug"
    } else {
        "fairway_server=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt().with_env_filter(filter).with_target(false).init();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.bind_address.set_port(port);
    }
    if let Some(port) = cli.voice_port {
        config.voice_address.set_port(port);
    }
    config.validate()?;

    let mut game = RenetHost::new(
        TransportConfig {
            public_address: config.bind_address,
            max_clients: config.max_clients as usize,
            private_key: config.private_key,
        },
        create_channel_configs(),
    )
    .context("starting lobby transport")?;

    let mut voice = RenetHost::new(
        TransportConfig {
            public_address: config.voice_address,
            max_clients: config.max_clients as usize,
            private_key: config.private_key,
        },
        create_voice_channel_configs(),
    )
    .context("starting voice transport")?;

    info!("Fairway Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Lobby on {:?}, voice on {:?}", game.local_addr(), voice.local_addr());
    info!("Protocol ID: {:016x}", PROTOCOL_ID);

    let tick_duration = config.tick_duration();
    let mut server = Server::new(config);

    let mut ticker = tokio::time::interval(tick_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last_tick = Instant::now();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let delta = now - last_tick;
                last_tick = now;

                game.update(delta);
                voice.update(delta);
                server.update(delta, &mut game, &mut voice);
                game.send_packets();
                voice.send_packets();
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
