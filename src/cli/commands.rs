use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the speed-watcher application
/// Uses clap's derive macros for automatic CLI generation
#[derive(Parser)]
#[command(author = "Kaipo Chen")]
#[command(version)] // Automatically uses version from Cargo.toml
#[command(about = "Internet Speed Collector - Periodically measure download, upload and latency and store the results")]
#[command(long_about = "Speed Watcher runs fast.com and speedtest.net measurements at a fixed interval, \
rejects implausible readings and appends the remaining results to a SQLite database.\n\n\
Configuration is read from speed-watcher.toml (or --config), then SPEEDWATCH_* environment variables. \
Command-line flags override both.")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, help = "Configuration file (default: ./speed-watcher.toml if present)")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands for the speed-watcher application
#[derive(Subcommand)]
pub enum Commands {
    /// Collect measurements until interrupted
    #[command(about = "Run the collector until Ctrl+C or SIGTERM")]
    #[command(long_about = "Starts the collection loop. Each cycle runs every configured provider \
concurrently; cycles start one interval apart. Ctrl+C or SIGTERM stops the collector after the \
current cycle and closes the database.\n\n\
Examples:\n  \
speed-watcher run                         # Use configured interval and database\n  \
speed-watcher run --interval 30           # Measure every 30 minutes\n  \
speed-watcher run --db /var/lib/speed.db  # Store results elsewhere")]
    Run {
        /// Minutes between the starts of consecutive cycles
        #[arg(short, long, help = "Interval between cycles in minutes (default 10)")]
        interval: Option<u64>,

        /// SQLite database path
        #[arg(short, long, help = "Database file for accepted results")]
        db: Option<PathBuf>,
    },

    /// Run a single cycle and print what happened
    #[command(about = "Run one measurement cycle and exit")]
    Once {
        /// SQLite database path
        #[arg(short, long, help = "Database file for accepted results")]
        db: Option<PathBuf>,
    },
}
