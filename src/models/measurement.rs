//! Measurement data structures
//!
//! This module contains the MeasurementResult produced by a provider probe,
//! the closed set of known providers, and the sanity bounds applied to
//! results before they are stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known measurement providers
/// Each variant maps to a stable wire name used in storage and configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Netflix fast.com download probe (no upload or latency)
    #[serde(rename = "fast.com", alias = "fast_com", alias = "fastcom")]
    FastCom,
    /// Ookla speedtest.net via the speedtest-cli tool
    #[serde(rename = "speedtest.net", alias = "speedtest")]
    Speedtest,
}

impl Provider {
    /// Every provider, in default execution order
    pub const ALL: [Provider; 2] = [Provider::FastCom, Provider::Speedtest];

    /// Stable identifier stored alongside each result
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::FastCom => "fast.com",
            Provider::Speedtest => "speedtest.net",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast.com" | "fast_com" | "fastcom" => Ok(Provider::FastCom),
            "speedtest.net" | "speedtest" => Ok(Provider::Speedtest),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Result of a single provider probe
/// Created by a provider at the end of one measurement and never mutated afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    /// UTC instant at which the measurement completed
    pub timestamp: DateTime<Utc>,
    /// Provider that produced this result
    pub provider: Provider,
    /// Human-readable label of the server or endpoint used
    pub server: String,
    /// Download throughput in megabits per second (0 when not measured)
    pub download_mbps: f64,
    /// Upload throughput in megabits per second (0 when not measured)
    pub upload_mbps: f64,
    /// Round-trip latency in milliseconds (0 when not measured)
    pub latency_ms: f64,
    /// Provider's native response, kept verbatim for auditing
    pub raw_payload: String,
}

impl MeasurementResult {
    /// Creates a result stamped with the current time
    pub fn new(
        provider: Provider,
        server: impl Into<String>,
        download_mbps: f64,
        upload_mbps: f64,
        latency_ms: f64,
        raw_payload: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            provider,
            server: server.into(),
            download_mbps,
            upload_mbps,
            latency_ms,
            raw_payload: raw_payload.into(),
        }
    }
}

/// Maximum plausible throughput values; anything above is treated as an outlier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationBounds {
    pub max_download_mbps: f64,
    pub max_upload_mbps: f64,
}

impl ValidationBounds {
    pub const DEFAULT_MAX_MBPS: f64 = 1000.0;

    pub fn new(max_download_mbps: f64, max_upload_mbps: f64) -> Self {
        Self {
            max_download_mbps,
            max_upload_mbps,
        }
    }
}

impl Default for ValidationBounds {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_MBPS, Self::DEFAULT_MAX_MBPS)
    }
}
