//! PiHome node command
//!
//! Runs one of the node daemons, the deferred-write sweeper, the daily
//! backup or the boot-time vault unseal.

mod backup;
mod daemons;
mod node;
mod signal;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use infrastructure::{AppConfig, UnsealOutcome, VaultUnsealer, init_logging};
use tracing::{error, info};

use crate::daemons::Daemon;
use crate::node::Node;
use crate::signal::shutdown_signal;

/// Exit code when a shutdown signal arrives before the vault answered
const EXIT_INTERRUPTED: u8 = 255;

/// PiHome node command
#[derive(Parser)]
#[command(name = "pihome")]
#[command(author, version, about = "PiHome node daemons and maintenance", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long, env = "PIHOME_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record temperature and humidity from the local sensor
    Sensor {
        /// Collect once and exit
        #[arg(long)]
        once: bool,
    },

    /// Record solar energy totals and the current power flow
    Solar {
        #[arg(long)]
        once: bool,
    },

    /// Store the quote of the day
    Quote {
        #[arg(long)]
        once: bool,
    },

    /// Record this node's system statistics
    Health {
        #[arg(long)]
        once: bool,
    },

    /// Replay writes deferred while a database was unreachable
    Sweep {
        #[arg(long)]
        once: bool,
    },

    /// Back up the database, vault data and media every day
    Backup {
        /// Back up now and exit
        #[arg(long)]
        once: bool,
    },

    /// Unseal the local vault with the keys in the environment
    Unseal,
}

impl Commands {
    const fn daemon(&self) -> Option<(Daemon, bool)> {
        match *self {
            Self::Sensor { once } => Some((Daemon::Sensor, once)),
            Self::Solar { once } => Some((Daemon::Solar, once)),
            Self::Quote { once } => Some((Daemon::Quote, once)),
            Self::Health { once } => Some((Daemon::Health, once)),
            Self::Sweep { once } => Some((Daemon::Sweep, once)),
            Self::Backup { .. } | Self::Unseal => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    if let Some((daemon, once)) = cli.command.daemon() {
        let Some(node) = Node::connect(config).await? else {
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        };
        info!(node = %node.name, ?daemon, "Connected to vault");
        daemons::run(&node, daemon, once).await?;
        info!(?daemon, "Exited");
        return Ok(ExitCode::SUCCESS);
    }

    match cli.command {
        Commands::Backup { once: true } => {
            backup::run_backup(&config.backup, Local::now().date_naive()).await?;
        },
        Commands::Backup { once: false } => {
            tokio::select! {
                result = backup::run_daily(&config.backup) => result?,
                () = shutdown_signal() => info!("Exiting backup service"),
            }
        },
        Commands::Unseal => {
            let unsealer = VaultUnsealer::new(config.vault.unseal.clone())?;
            match unsealer.run().await {
                Ok(UnsealOutcome::AlreadyUnsealed) => info!("Vault was already unsealed"),
                Ok(UnsealOutcome::Unsealed { keys_used }) => {
                    info!(keys_used, "Vault unsealed");
                },
                Err(e) => {
                    error!(error = %e, "FATAL ERROR");
                    return Err(e.into());
                },
            }
        },
        _ => {},
    }

    Ok(ExitCode::SUCCESS)
}
