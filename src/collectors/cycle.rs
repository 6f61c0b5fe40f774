//! One measurement cycle
//!
//! Every configured provider runs as its own tokio task. Results are handled
//! in completion order, so a slow or failing provider never holds back the
//! others and a cycle lasts as long as its slowest provider.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::collectors::validation::{RejectionReason, Verdict, validate};
use crate::errors::ProviderError;
use crate::models::{MeasurementResult, Provider, ValidationBounds};
use crate::providers::SpeedProvider;
use crate::storage::ResultStore;

/// What happened to one provider's measurement in a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeStatus {
    Stored,
    Rejected(RejectionReason),
    ProviderFailed(String),
    StoreFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutcome {
    pub provider: Provider,
    pub status: OutcomeStatus,
}

/// Per-cycle summary, in completion order. Used for logging and by the
/// scheduler's store failure policy; never persisted.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub outcomes: Vec<ProviderOutcome>,
}

impl CycleOutcome {
    fn count(&self, predicate: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn stored_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Stored))
    }

    pub fn rejected_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Rejected(_)))
    }

    pub fn provider_failure_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::ProviderFailed(_)))
    }

    pub fn store_failure_count(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::StoreFailed(_)))
    }

    /// True when saves were attempted and none of them succeeded
    pub fn all_saves_failed(&self) -> bool {
        self.store_failure_count() > 0 && self.stored_count() == 0
    }
}

pub struct CycleRunner {
    providers: Vec<Arc<dyn SpeedProvider>>,
    store: Arc<dyn ResultStore>,
    bounds: ValidationBounds,
    cycle_count: u64,
}

impl CycleRunner {
    pub fn new(
        providers: Vec<Arc<dyn SpeedProvider>>,
        store: Arc<dyn ResultStore>,
        bounds: ValidationBounds,
    ) -> Self {
        Self {
            providers,
            store,
            bounds,
            cycle_count: 0,
        }
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.providers.iter().map(|p| p.provider())
    }

    /// Runs every provider once and processes each result as soon as it arrives
    ///
    /// Never fails as a whole: provider failures, rejections and store errors
    /// are logged and reported in the returned [`CycleOutcome`].
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycle_count += 1;
        let cycle = self.cycle_count;
        let started = Instant::now();
        let started_at = Utc::now();

        debug!(
            "Starting measurement cycle #{} with {} providers",
            cycle,
            self.providers.len()
        );

        let mut tasks = JoinSet::new();
        let mut task_providers = HashMap::new();

        for adapter in &self.providers {
            let adapter = Arc::clone(adapter);
            let provider = adapter.provider();
            let handle = tasks.spawn(async move { (provider, adapter.measure().await) });
            task_providers.insert(handle.id(), provider);
        }

        let mut outcomes = Vec::with_capacity(self.providers.len());

        while let Some(joined) = tasks.join_next().await {
            let (provider, measured) = match joined {
                Ok(completed) => completed,
                Err(join_error) => {
                    let Some(&provider) = task_providers.get(&join_error.id()) else {
                        error!("Cycle #{cycle}: a provider task ended without a known provider");
                        continue;
                    };
                    let cause = if join_error.is_panic() {
                        format!("provider panicked: {}", panic_message(join_error.into_panic()))
                    } else {
                        "provider task was cancelled".to_string()
                    };
                    (provider, Err(ProviderError::new(provider, cause)))
                }
            };

            let status = self.process(provider, measured);
            outcomes.push(ProviderOutcome { provider, status });
        }

        let outcome = CycleOutcome {
            cycle,
            started_at,
            duration: started.elapsed(),
            outcomes,
        };

        info!(
            "Cycle #{} finished in {:.1}s: {} stored, {} rejected, {} provider failures, {} store failures",
            outcome.cycle,
            outcome.duration.as_secs_f64(),
            outcome.stored_count(),
            outcome.rejected_count(),
            outcome.provider_failure_count(),
            outcome.store_failure_count()
        );

        outcome
    }

    fn process(
        &self,
        provider: Provider,
        measured: Result<MeasurementResult, ProviderError>,
    ) -> OutcomeStatus {
        let result = match measured {
            Ok(result) => result,
            Err(e) => {
                warn!("{e}");
                return OutcomeStatus::ProviderFailed(e.cause);
            }
        };

        match validate(&result, &self.bounds) {
            Verdict::Rejected(reason) => {
                warn!(
                    "Rejected {} result ({}): download={} Mbps, upload={} Mbps, latency={} ms (bounds: {} / {} Mbps)",
                    provider,
                    reason,
                    result.download_mbps,
                    result.upload_mbps,
                    result.latency_ms,
                    self.bounds.max_download_mbps,
                    self.bounds.max_upload_mbps
                );
                OutcomeStatus::Rejected(reason)
            }
            Verdict::Accepted => {
                info!(
                    "{} -> {:.2} Mbps down, {:.2} Mbps up, {:.2} ms latency (server: {})",
                    provider, result.download_mbps, result.upload_mbps, result.latency_ms, result.server
                );

                match self.store.save(&result) {
                    Ok(()) => OutcomeStatus::Stored,
                    Err(e) => {
                        error!("Failed to store {provider} result: {e}");
                        OutcomeStatus::StoreFailed(e.to_string())
                    }
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
