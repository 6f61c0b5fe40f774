use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

use crate::config::FastComSettings;
use crate::errors::ProviderError;
use crate::models::{MeasurementResult, Provider};
use crate::providers::{SpeedProvider, round2};

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Download-only probe against fast.com targets
/// Upload and latency are not measured and are reported as zero
pub struct FastComProvider {
    client: Client,
    endpoint: String,
}

impl FastComProvider {
    pub fn new(settings: &FastComSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::new(Provider::FastCom, format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
        })
    }

    async fn run(&self) -> Result<MeasurementResult> {
        let config: Value = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("target discovery request failed")?
            .error_for_status()
            .context("target discovery returned an error status")?
            .json()
            .await
            .context("target discovery response is not JSON")?;

        let url = target_url(&config)?;
        debug!("fast.com download target: {url}");

        let start = Instant::now();
        let body = self
            .client
            .get(&url)
            .send()
            .await
            .context("download request failed")?
            .error_for_status()
            .context("download returned an error status")?
            .bytes()
            .await
            .context("download interrupted")?;
        let duration_s = start.elapsed().as_secs_f64();

        let size_mb = body.len() as f64 / BYTES_PER_MB;
        let download_mbps = throughput_mbps(size_mb, duration_s)?;

        Ok(MeasurementResult::new(
            Provider::FastCom,
            "fast.com",
            download_mbps,
            0.0,
            0.0,
            json!({ "size_mb": size_mb, "duration_s": duration_s }).to_string(),
        ))
    }
}

#[async_trait]
impl SpeedProvider for FastComProvider {
    fn provider(&self) -> Provider {
        Provider::FastCom
    }

    async fn measure(&self) -> Result<MeasurementResult, ProviderError> {
        self.run()
            .await
            .map_err(|e| ProviderError::new(Provider::FastCom, format!("{e:#}")))
    }
}

/// Extracts the first download URL from a fast.com target discovery response
fn target_url(config: &Value) -> Result<String> {
    config
        .get("targets")
        .and_then(Value::as_array)
        .and_then(|targets| targets.first())
        .and_then(|target| target.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("response has no targets[0].url"))
}

/// Megabits per second for `size_mb` megabytes downloaded in `duration_s` seconds
fn throughput_mbps(size_mb: f64, duration_s: f64) -> Result<f64> {
    if duration_s <= 0.0 {
        bail!("download finished in {duration_s}s; cannot compute throughput");
    }
    Ok(round2(size_mb * 8.0 / duration_s))
}
