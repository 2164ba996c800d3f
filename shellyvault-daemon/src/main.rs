//! Shellyvault Daemon
//!
//! Headless lifecycle glue around one [`BackupCoordinator`]:
//! - `run` schedules periodic sweeps and performs an initial one
//! - `backup`, `restore-script`, `restore-config` are manual triggers
//! - `status` probes once and prints the coordinator state
//!
//! The coordinator is held and passed by explicit reference; there is no
//! ambient registry.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shellyvault_core::{config, BackupCoordinator};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shellyvault-daemon", version, about = "Backup daemon for Shelly Gen2+ scripts")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Device endpoint, e.g. http://192.168.1.40 (overrides the config file)
    #[arg(long, env = "SHELLYVAULT_URL", global = true)]
    url: Option<String>,

    /// Device password (overrides the config file)
    #[arg(long, env = "SHELLYVAULT_PASSWORD", global = true)]
    password: Option<String>,

    /// Snapshot store root (overrides the config file)
    #[arg(long, env = "SHELLYVAULT_BACKUP_PATH", global = true)]
    backup_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon: one initial sweep, then periodic sweeps
    Run {
        /// Seconds between sweeps (overrides the config file)
        #[arg(long, env = "SHELLYVAULT_INTERVAL")]
        interval: Option<u64>,
    },
    /// Perform one backup sweep and exit
    Backup,
    /// Push a backed-up script onto the device
    RestoreScript {
        /// Script id on the device
        #[arg(long)]
        id: u32,
        /// Explicit snapshot file instead of the default lookup
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Push the backed-up configuration onto the device
    RestoreConfig {
        /// Explicit snapshot file instead of the default lookup
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Probe the device once and print the coordinator state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut vault_config = config::load_config(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        vault_config.url = url;
    }
    if let Some(password) = cli.password {
        vault_config.password = Some(password);
    }
    if let Some(backup_path) = cli.backup_path {
        vault_config.backup_path = backup_path;
    }
    vault_config.validate()?;

    let coordinator = BackupCoordinator::from_config(&vault_config);

    match cli.command {
        Command::Run { interval } => {
            let interval_secs = interval.unwrap_or(vault_config.backup_interval_secs);
            run_daemon(coordinator, interval_secs).await
        }
        Command::Backup => {
            coordinator.backup_all().await?;
            Ok(())
        }
        Command::RestoreScript { id, path } => {
            coordinator.restore_script(id, path).await?;
            Ok(())
        }
        Command::RestoreConfig { path } => {
            coordinator.restore_config(path).await?;
            Ok(())
        }
        Command::Status => {
            // The probe's outcome lands in the state either way.
            let _ = coordinator.probe_identity().await;
            let state = coordinator.state();
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
    }
}

async fn run_daemon(coordinator: BackupCoordinator, interval_secs: u64) -> Result<()> {
    info!("🚀 Shellyvault daemon starting, sweep interval {}s", interval_secs);

    // Log availability flips as they are published.
    let mut state_rx = coordinator.subscribe();
    tokio::spawn(async move {
        let mut last_available: Option<bool> = None;
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow_and_update().clone();
            if last_available != Some(state.is_available) {
                match (&state.device_id, state.is_available) {
                    (Some(id), true) => info!("✅ Device {} is reachable", id),
                    (Some(id), false) => info!("⚠️ Device {} is unreachable", id),
                    (None, _) => {}
                }
                last_available = Some(state.is_available);
            }
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Scheduled sweep failures are logged, never fatal.
                if let Err(err) = coordinator.backup_all().await {
                    error!("Scheduled sweep failed: {}", err);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}
