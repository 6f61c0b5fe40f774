use async_trait::async_trait;
use log::warn;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::ProviderError;
use crate::models::{MeasurementResult, Provider};

// Speed measurement providers
// Each adapter wraps one external measurement technique behind the same trait
// and converts every fault into a ProviderError for its own provider

/// Netflix fast.com download probe over HTTPS
pub mod fast_com;

/// Ookla speedtest.net through the speedtest-cli executable
pub mod speedtest_cli;

pub use fast_com::FastComProvider;
pub use speedtest_cli::SpeedtestCliProvider;

#[async_trait]
pub trait SpeedProvider: Send + Sync {
    /// Provider this adapter measures with
    fn provider(&self) -> Provider;

    /// Runs one probe. Must not panic on network or parse failures; those
    /// are reported as `ProviderError`. Adapters that block should move the
    /// blocking work onto `tokio::task::spawn_blocking`.
    async fn measure(&self) -> Result<MeasurementResult, ProviderError>;
}

/// Builds the adapters enabled in the configuration, in configured order
pub fn build_providers(config: &AppConfig) -> Result<Vec<Arc<dyn SpeedProvider>>, ProviderError> {
    let mut providers: Vec<Arc<dyn SpeedProvider>> = Vec::new();
    let mut seen = Vec::new();

    for provider in &config.providers {
        if seen.contains(provider) {
            warn!("Provider {provider} listed more than once; running it once per cycle");
            continue;
        }
        seen.push(*provider);

        match provider {
            Provider::FastCom => providers.push(Arc::new(FastComProvider::new(&config.fast_com)?)),
            Provider::Speedtest => providers.push(Arc::new(SpeedtestCliProvider::new(&config.speedtest))),
        }
    }

    Ok(providers)
}

/// Rounds a throughput value to two decimals as reported in logs and storage
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
