mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, commands::Commands};
use log::error;

use speed_watcher::collectors::{OutcomeStatus, Scheduler, StopSignal, spawn_signal_listener};
use speed_watcher::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { interval, db } => {
            let config = config.with_overrides(interval, db)?;
            let stop = StopSignal::new();
            spawn_signal_listener(stop.clone());

            let mut scheduler = Scheduler::from_config(&config, stop)?;
            if let Err(e) = scheduler.run().await {
                error!("Collector terminated: {e:#}");
                return Err(e);
            }
        }
        Commands::Once { db } => {
            let config = config.with_overrides(None, db)?;
            let mut scheduler = Scheduler::from_config(&config, StopSignal::new())?.with_max_cycles(1);
            let report = scheduler.run().await?;

            println!("Speed Measurement");
            println!("=================");

            if let Some(outcome) = report.last_outcome {
                for entry in outcome.outcomes {
                    let status = match entry.status {
                        OutcomeStatus::Stored => "stored".to_string(),
                        OutcomeStatus::Rejected(reason) => format!("rejected ({reason})"),
                        OutcomeStatus::ProviderFailed(cause) => format!("failed: {cause}"),
                        OutcomeStatus::StoreFailed(cause) => format!("not stored: {cause}"),
                    };
                    println!("  {:<14} {}", entry.provider.to_string(), status);
                }
                println!("\nCycle took {:.1}s", outcome.duration.as_secs_f64());
            }

            println!("Results written to {}", config.database_path.display());
        }
    }

    Ok(())
}

/// Logs go to stderr through env_logger; RUST_LOG wins over the LOG_LEVEL fallback
fn init_logging() {
    let fallback = std::env::var("LOG_LEVEL")
        .map(|level| level.to_lowercase())
        .unwrap_or_else(|_| "info".to_string());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(fallback))
        .format_timestamp_secs()
        .init();
}
