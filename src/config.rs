//! Application configuration
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `SPEEDWATCH_*` environment variables. The result
//! is validated once at startup and passed by value into the components that
//! need it; nothing reads the environment after that.

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{Provider, ValidationBounds};

/// Base name of the optional configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "speed-watcher";

/// Prefix for environment overrides, e.g. `SPEEDWATCH_INTERVAL_MINUTES=5`
pub const ENV_PREFIX: &str = "SPEEDWATCH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Minutes between the starts of consecutive measurement cycles
    pub interval_minutes: u64,
    /// SQLite database file receiving accepted results
    pub database_path: PathBuf,
    /// Sanity bounds applied before storing
    pub bounds: ValidationBounds,
    /// Providers to run each cycle, in order
    pub providers: Vec<Provider>,
    /// Consecutive cycles whose saves all failed before the collector gives up (0 = never)
    pub max_consecutive_store_failures: u32,
    pub fast_com: FastComSettings,
    pub speedtest: SpeedtestSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastComSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedtestSettings {
    /// Executable producing speedtest.net JSON on stdout
    pub command: String,
    pub args: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 10,
            database_path: PathBuf::from("speed_tests.db"),
            bounds: ValidationBounds::default(),
            providers: Provider::ALL.to_vec(),
            max_consecutive_store_failures: 3,
            fast_com: FastComSettings::default(),
            speedtest: SpeedtestSettings::default(),
        }
    }
}

impl Default for FastComSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.fast.com/netflix/speedtest/v2".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for SpeedtestSettings {
    fn default() -> Self {
        Self {
            command: "speedtest-cli".to_string(),
            args: vec!["--json".to_string()],
        }
    }
}

impl AppConfig {
    /// Loads configuration from the given file (or the default file if present)
    /// and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`AppConfig::load`] but reads environment overrides from `env`
    /// instead of the process environment when provided
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("providers")
                .source(env),
        );

        let config: AppConfig = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides on top of the loaded values
    pub fn with_overrides(mut self, interval_minutes: Option<u64>, database_path: Option<PathBuf>) -> Result<Self> {
        if let Some(minutes) = interval_minutes {
            self.interval_minutes = minutes;
        }
        if let Some(path) = database_path {
            self.database_path = path;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 {
            bail!("Invalid interval: must be at least 1 minute");
        }

        for (name, value) in [
            ("max_download_mbps", self.bounds.max_download_mbps),
            ("max_upload_mbps", self.bounds.max_upload_mbps),
        ] {
            if !value.is_finite() || value <= 0.0 {
                bail!("Invalid bound {name}: {value} (must be a positive number)");
            }
        }

        if self.providers.is_empty() {
            bail!("No providers configured");
        }

        if self.providers.contains(&Provider::FastCom) {
            if self.fast_com.endpoint.trim().is_empty() {
                bail!("Invalid fast.com endpoint: empty string");
            }
            if self.fast_com.timeout_secs == 0 {
                bail!("Invalid fast.com timeout: must be at least 1 second");
            }
        }

        if self.providers.contains(&Provider::Speedtest) && self.speedtest.command.trim().is_empty() {
            bail!("Invalid speedtest command: empty string");
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}
