use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::SpeedtestSettings;
use crate::errors::ProviderError;
use crate::models::{MeasurementResult, Provider};
use crate::providers::{SpeedProvider, round2};

const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Runs `speedtest-cli --json` and converts its report into a measurement
pub struct SpeedtestCliProvider {
    command: String,
    args: Vec<String>,
}

/// Subset of the speedtest-cli JSON report we rely on
#[derive(Debug, Deserialize)]
struct SpeedtestReport {
    /// Bits per second
    download: f64,
    /// Bits per second
    upload: f64,
    /// Milliseconds
    ping: f64,
    server: SpeedtestServer,
}

#[derive(Debug, Deserialize)]
struct SpeedtestServer {
    name: String,
}

impl SpeedtestCliProvider {
    pub fn new(settings: &SpeedtestSettings) -> Self {
        Self {
            command: settings.command.clone(),
            args: settings.args.clone(),
        }
    }

    async fn run(&self) -> Result<MeasurementResult> {
        debug!("Running {} {}", self.command, self.args.join(" "));

        let output = Command::new(&self.command)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to start '{}'", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("'{}' exited with {}: {}", self.command, output.status, stderr.trim());
        }

        let stdout = String::from_utf8(output.stdout).context("report is not valid UTF-8")?;
        parse_report(&stdout)
    }
}

#[async_trait]
impl SpeedProvider for SpeedtestCliProvider {
    fn provider(&self) -> Provider {
        Provider::Speedtest
    }

    async fn measure(&self) -> Result<MeasurementResult, ProviderError> {
        self.run()
            .await
            .map_err(|e| ProviderError::new(Provider::Speedtest, format!("{e:#}")))
    }
}

fn parse_report(stdout: &str) -> Result<MeasurementResult> {
    let raw = stdout.trim();
    let report: SpeedtestReport = serde_json::from_str(raw).context("malformed speedtest report")?;

    Ok(MeasurementResult::new(
        Provider::Speedtest,
        report.server.name,
        round2(report.download / BITS_PER_MEGABIT),
        round2(report.upload / BITS_PER_MEGABIT),
        report.ping,
        raw,
    ))
}
