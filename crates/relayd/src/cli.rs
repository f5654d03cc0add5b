//! `relayd` command line.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (127.0.0.1:8080)
//! relayd
//!
//! # Custom address, rooms taken from the handshake query string
//! relayd --bind 0.0.0.0:9000 --room-source attribute
//!
//! # Explicit config file
//! RELAY_CONFIG=/etc/relay/relayd.toml relayd
//!
//! # Enable debug logging
//! RUST_LOG=relayd=debug relayd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{RelayConfig, ENV_CONFIG};
use crate::listeners::ListenerTable;
use crate::registry::{spawn_registry_with_buffer, EmptyRoomPolicy};
use crate::router::RoomSource;
use crate::server::RelayServer;

/// WebRTC signaling relay
#[derive(Parser, Debug)]
#[command(name = "relayd", version, about)]
pub struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Where join and broadcast rooms come from
    #[arg(long, value_enum)]
    pub room_source: Option<RoomSourceArg>,

    /// Keep rooms around after their last member leaves
    #[arg(long)]
    pub retain_empty_rooms: bool,

    /// Do not send a welcome notice to new connections
    #[arg(long)]
    pub no_welcome: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoomSourceArg {
    Envelope,
    Attribute,
}

impl From<RoomSourceArg> for RoomSource {
    fn from(arg: RoomSourceArg) -> Self {
        match arg {
            RoomSourceArg::Envelope => RoomSource::Envelope,
            RoomSourceArg::Attribute => RoomSource::Attribute,
        }
    }
}

impl Args {
    /// Resolves the effective configuration: file, then environment, then flags.
    pub fn resolve_config(&self) -> Result<RelayConfig> {
        let mut config = RelayConfig::load_or_default(self.config.as_deref())
            .context("Failed to load configuration")?;

        config
            .apply_env()
            .context("Invalid environment override")?;

        self.apply_to(&mut config)?;
        Ok(config)
    }

    /// Applies the command-line flags on top of `config`.
    pub fn apply_to(&self, config: &mut RelayConfig) -> Result<()> {
        if let Some(bind) = self.bind.as_deref() {
            config.set_bind(bind).context("Invalid --bind")?;
        }
        if let Some(source) = self.room_source {
            config.router.room_source = source.into();
        }
        if self.retain_empty_rooms {
            config.registry.empty_rooms = EmptyRoomPolicy::Retain;
        }
        if self.no_welcome {
            config.router.welcome = false;
        }
        Ok(())
    }
}

/// Log filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "relayd=info,relay_protocol=info";

/// Builds the log filter from `RUST_LOG`-style directives, falling back to
/// [`DEFAULT_LOG_FILTER`] only when none are usable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Binary entry point.
pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = args.resolve_config()?;
    run_daemon(config)
}

#[tokio::main]
async fn run_daemon(config: RelayConfig) -> Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "Relay daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry =
        spawn_registry_with_buffer(config.registry.empty_rooms, config.registry.command_buffer);
    info!(empty_rooms = ?config.registry.empty_rooms, "Registry started");

    let server = RelayServer::new(
        config.server.clone(),
        registry,
        ListenerTable::new(),
        config.router,
        cancel_token,
    );

    info!(
        bind = %config.server.bind,
        room_source = ?config.router.room_source,
        "Starting server"
    );

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Relay daemon stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
