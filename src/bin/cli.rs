//! Vessel Tracker CLI
//!
//! Local execution entry point for collection and elaboration cycles.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use vessel_tracker::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, CycleSummary},
    services::VesselPageScraper,
    storage::{LocalStorage, RunLock, TrackerStorage, export},
    utils::datetime::{MAX_WATCH_HOURS, watch_interval},
};

/// Vessel Tracker - Port departure monitor
#[derive(Parser, Debug)]
#[command(
    name = "vessel-tracker",
    version,
    about = "Tracks vessel departures between monitored ports"
)]
struct Cli {
    /// Path to storage directory containing config and state files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List vessels at every monitored port into the current snapshot
    Collect,

    /// Run one elaboration cycle on the stored snapshots
    Elaborate,

    /// Run full cycle: Collect → Elaborate
    Cycle,

    /// Run full cycles repeatedly until interrupted
    Watch {
        /// Hours between two cycles
        #[arg(
            long,
            default_value_t = 4,
            value_parser = clap::value_parser!(u64).range(1..=MAX_WATCH_HOURS)
        )]
        every_hours: u64,
    },

    /// Export the master report as CSV
    Export {
        /// Output file (default: {storage_dir}/reports/master.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,

    /// Show snapshot and report info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Set the returned flag on Ctrl-C so cycles stop between vessels.
fn install_shutdown_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, finishing the current vessel...");
            handle.store(true, Ordering::SeqCst);
        }
    });
    flag
}

/// Refuse to start a run on a config that does not validate.
fn check_config(config: &Config) -> Result<()> {
    config.validate().inspect_err(|e| log::error!("Config validation failed: {}", e))
}

fn acquire_lock(storage_dir: &std::path::Path, config: &Config) -> Result<Option<RunLock>> {
    let path = storage_dir.join(&config.paths.lock_file);
    let lock = RunLock::acquire(&path)?;
    if lock.is_none() {
        log::warn!(
            "Another run holds {}, exiting without running",
            path.display()
        );
    }
    Ok(lock)
}

/// Collect, then elaborate.
async fn run_full_cycle(
    config: &Arc<Config>,
    storage: &LocalStorage,
    lookup: &VesselPageScraper,
    shutdown: &AtomicBool,
) -> Result<CycleSummary> {
    pipeline::run_collector(Arc::clone(config), storage).await?;
    if shutdown.load(Ordering::SeqCst) {
        log::warn!("Interrupted after collection, elaboration skipped");
        return Ok(CycleSummary::default());
    }
    pipeline::run_cycle(config, storage, lookup, shutdown).await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Vessel Tracker starting...");

    // Load configuration
    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let config = Arc::new(config);
    let storage = LocalStorage::with_paths(&cli.storage_dir, config.paths.clone());

    match cli.command {
        Command::Collect => {
            check_config(&config)?;
            let Some(lock) = acquire_lock(&cli.storage_dir, &config)? else {
                return Ok(());
            };
            pipeline::run_collector(Arc::clone(&config), &storage).await?;
            lock.release()?;
        }

        Command::Elaborate => {
            check_config(&config)?;
            let Some(lock) = acquire_lock(&cli.storage_dir, &config)? else {
                return Ok(());
            };
            let shutdown = install_shutdown_flag();
            let lookup = VesselPageScraper::new(&config.tracker)?;
            pipeline::run_cycle(&config, &storage, &lookup, &shutdown).await?;
            lock.release()?;
        }

        Command::Cycle => {
            check_config(&config)?;
            let Some(lock) = acquire_lock(&cli.storage_dir, &config)? else {
                return Ok(());
            };
            let shutdown = install_shutdown_flag();
            let lookup = VesselPageScraper::new(&config.tracker)?;
            run_full_cycle(&config, &storage, &lookup, &shutdown).await?;
            lock.release()?;
        }

        Command::Watch { every_hours } => {
            check_config(&config)?;
            let interval = watch_interval(every_hours)?;
            let Some(lock) = acquire_lock(&cli.storage_dir, &config)? else {
                return Ok(());
            };
            let shutdown = install_shutdown_flag();
            let lookup = VesselPageScraper::new(&config.tracker)?;

            log::info!("Resident mode: one cycle every {} hours", every_hours);
            while !shutdown.load(Ordering::SeqCst) {
                if let Err(e) = run_full_cycle(&config, &storage, &lookup, &shutdown).await {
                    log::error!("Cycle failed: {}", e);
                }
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }

                log::info!("Next cycle in {} hours", every_hours);
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = tokio::signal::ctrl_c() => {
                        shutdown.store(true, Ordering::SeqCst);
                    }
                }
            }
            log::info!("Resident mode stopped");
            lock.release()?;
        }

        Command::Export { output } => {
            let output = output.unwrap_or_else(|| cli.storage_dir.join("reports/master.csv"));
            let rows = storage.load_report().await?;
            export::export_csv(&rows, &output).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            check_config(&config)?;
            if config.ports.is_empty() {
                log::error!("No ports configured in {}", config_path.display());
                return Err(AppError::config("no ports configured"));
            }
            log::info!("✓ Config OK ({} monitored ports)", config.ports.len());

            log::info!("All validations passed!");
        }

        Command::Info => {
            let ceiling = config.retry.ceiling;
            log::info!("Storage directory: {}", cli.storage_dir.display());

            match storage.load_current().await? {
                Some(current) => log::info!(
                    "Current snapshot: {} vessels ({} at or over the retry ceiling)",
                    current.len(),
                    current.exhausted_count(ceiling)
                ),
                None => log::info!("Current snapshot: not found"),
            }

            let previous = storage.load_previous().await?;
            log::info!(
                "Previous snapshot: {} vessels ({} at or over the retry ceiling)",
                previous.len(),
                previous.exhausted_count(ceiling)
            );

            let report = storage.load_report().await?;
            log::info!("Master report: {} rows", report.len());

            let lock_path = cli.storage_dir.join(&config.paths.lock_file);
            match RunLock::holder(&lock_path)? {
                Some(holder) => log::info!("Run lock: held ({})", holder),
                None => log::info!("Run lock: free"),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
