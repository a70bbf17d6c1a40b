//! LendLoop Penalty Sweeper
//!
//! Hosts a lending engine and periodically collects unpaid penalties from
//! every liable member, paying each beneficiary what the borrower's balance
//! allows.
//!
//! # Usage
//!
//! ```bash
//! # Sweep every minute with default marketplace rules
//! lendloop-sweeper
//!
//! # Custom config and a seeded demo marketplace
//! lendloop-sweeper --config /path/to/config.toml --demo
//!
//! # Environment overrides
//! LENDLOOP__SWEEP__INTERVAL_SECS=10 lendloop-sweeper
//! ```

mod config;
mod demo;

use clap::Parser;
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lendloop_engine::{LendingEngine, SettlementOutcome};

use crate::config::{LoggingConfig, SweeperConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// LendLoop penalty sweeper
#[derive(Parser, Debug)]
#[command(name = "lendloop-sweeper")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "LENDLOOP_CONFIG")]
    config: Option<String>,

    /// Seconds between sweeps
    #[arg(short, long, env = "LENDLOOP_SWEEP_INTERVAL")]
    interval: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LENDLOOP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "LENDLOOP_LOG_FORMAT")]
    log_format: Option<String>,

    /// Seed a small marketplace with an unpaid penalty
    #[arg(long)]
    demo: bool,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let mut sweeper_config = SweeperConfig::load(args.config.as_deref())?;
    apply_overrides(&mut sweeper_config, &args);
    sweeper_config.validate()?;

    init_logging(&sweeper_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        interval_secs = sweeper_config.sweep.interval_secs,
        "Starting LendLoop penalty sweeper"
    );

    let engine = LendingEngine::new(sweeper_config.engine.clone())?;

    if args.demo {
        demo::seed(&engine).await?;
    }

    if args.once {
        run_sweep(&engine).await;
        return Ok(());
    }

    tokio::select! {
        _ = sweep_loop(&engine, &sweeper_config) => {}
        _ = shutdown_signal() => {}
    }

    tracing::info!("Sweeper shutdown complete");
    Ok(())
}

fn apply_overrides(config: &mut SweeperConfig, args: &Args) {
    if let Some(interval) = args.interval {
        config.sweep.interval_secs = interval;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.logging.format = format.clone();
    }
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

// =============================================================================
// Sweeping
// =============================================================================

async fn sweep_loop(engine: &LendingEngine, config: &SweeperConfig) {
    let mut ticker = tokio::time::interval(config.sweep.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    if !config.sweep.run_on_start {
        // the first tick completes immediately
        ticker.tick().await;
    }

    loop {
        ticker.tick().await;
        run_sweep(engine).await;
    }
}

/// Totals of one sweep
#[derive(Debug, Default, PartialEq, Eq)]
struct SweepSummary {
    members: usize,
    settled: usize,
    partial: usize,
    no_funds: usize,
    collected: u64,
    still_owed: u64,
}

async fn run_sweep(engine: &LendingEngine) -> SweepSummary {
    let started = tokio::time::Instant::now();
    let reports = engine.sweep_penalties().await;

    let mut summary = SweepSummary {
        members: reports.len(),
        ..SweepSummary::default()
    };
    for report in &reports {
        match report.outcome {
            SettlementOutcome::Settled => summary.settled += 1,
            SettlementOutcome::Partial => summary.partial += 1,
            SettlementOutcome::NoFunds => summary.no_funds += 1,
            SettlementOutcome::NothingPending => {}
        }
        summary.collected += report.collected.value();
        summary.still_owed += report.still_owed.value();
    }

    tracing::info!(
        members = summary.members,
        settled = summary.settled,
        partial = summary.partial,
        no_funds = summary.no_funds,
        collected = summary.collected,
        still_owed = summary.still_owed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "penalty sweep finished"
    );
    summary
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lendloop_engine::EngineConfig;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["lendloop-sweeper", "--interval", "5", "--once"]);
        assert_eq!(args.interval, Some(5));
        assert!(args.once);
        assert!(!args.demo);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from(["lendloop-sweeper", "-i", "7", "--log-format", "json"]);
        let mut config = SweeperConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.sweep.interval_secs, 7);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_cli_interval_rescues_invalid_file_interval() {
        let mut config = SweeperConfig::default();
        config.sweep.interval_secs = 0;
        assert!(config.validate().is_err());

        let args = Args::parse_from(["lendloop-sweeper", "--interval", "5"]);
        apply_overrides(&mut config, &args);
        assert!(config.validate().is_ok());
        assert_eq!(config.sweep.interval_secs, 5);
    }

    #[tokio::test]
    async fn test_sweep_on_empty_engine() {
        let engine = LendingEngine::new(EngineConfig::default()).unwrap();
        assert_eq!(run_sweep(&engine).await, SweepSummary::default());
    }

    #[tokio::test]
    async fn test_demo_penalty_is_swept() {
        let engine = LendingEngine::new(EngineConfig::default()).unwrap();
        demo::seed(&engine).await.unwrap();

        // light damage on a 1000-value tent is 250; the borrower has 99 left
        let first = run_sweep(&engine).await;
        assert_eq!(first.members, 1);
        assert_eq!(first.partial, 1);
        assert_eq!(first.collected, 99);
        assert_eq!(first.still_owed, 151);

        let second = run_sweep(&engine).await;
        assert_eq!(second.no_funds, 1);
        assert_eq!(second.collected, 0);
    }
}
