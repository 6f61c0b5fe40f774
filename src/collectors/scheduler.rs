//! Fixed-rate scheduling of measurement cycles
//!
//! Each cycle starts one interval after the previous cycle started. A cycle
//! that overruns the interval is followed immediately by the next one; missed
//! starts are never replayed and cycles never overlap.

use anyhow::{Context, Result, bail};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

use crate::collectors::cycle::{CycleOutcome, CycleRunner};
use crate::collectors::shutdown::StopSignal;
use crate::config::AppConfig;
use crate::providers::build_providers;
use crate::storage::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Totals across all cycles of one scheduler run
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    pub cycles: u64,
    pub stored: usize,
    pub rejected: usize,
    pub provider_failures: usize,
    pub store_failures: usize,
    pub last_outcome: Option<CycleOutcome>,
}

impl SchedulerReport {
    fn record(&mut self, outcome: CycleOutcome) {
        self.cycles += 1;
        self.stored += outcome.stored_count();
        self.rejected += outcome.rejected_count();
        self.provider_failures += outcome.provider_failure_count();
        self.store_failures += outcome.store_failure_count();
        self.last_outcome = Some(outcome);
    }
}

pub struct Scheduler {
    interval: Duration,
    runner: CycleRunner,
    stop: StopSignal,
    state: SchedulerState,
    max_cycles: Option<u64>,
    max_consecutive_store_failures: u32,
}

impl Scheduler {
    pub const DEFAULT_STORE_FAILURE_LIMIT: u32 = 3;

    pub fn new(interval: Duration, runner: CycleRunner, stop: StopSignal) -> Self {
        Self {
            interval,
            runner,
            stop,
            state: SchedulerState::Idle,
            max_cycles: None,
            max_consecutive_store_failures: Self::DEFAULT_STORE_FAILURE_LIMIT,
        }
    }

    /// Wires the SQLite store and the configured providers into a scheduler
    pub fn from_config(config: &AppConfig, stop: StopSignal) -> Result<Self> {
        let store = SqliteStore::open(&config.database_path).with_context(|| {
            format!("Failed to open result store at {}", config.database_path.display())
        })?;
        let providers = build_providers(config).context("Failed to set up providers")?;
        let runner = CycleRunner::new(providers, Arc::new(store), config.bounds);

        Ok(Self::new(config.interval(), runner, stop)
            .with_store_failure_limit(config.max_consecutive_store_failures))
    }

    /// Stops on its own after `cycles` cycles
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Consecutive cycles in which every save failed before giving up; 0 never gives up
    pub fn with_store_failure_limit(mut self, limit: u32) -> Self {
        self.max_consecutive_store_failures = limit;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Runs cycles until a stop is requested, the cycle limit is reached or the
    /// store keeps failing. The store is closed before returning in every case.
    pub async fn run(&mut self) -> Result<SchedulerReport> {
        if self.state != SchedulerState::Idle {
            bail!("Scheduler has already been started");
        }

        let providers: Vec<String> = self.runner.providers().map(|p| p.to_string()).collect();
        info!(
            "Collector started (interval={}s, providers=[{}])",
            self.interval.as_secs(),
            providers.join(", ")
        );
        self.state = SchedulerState::Running;

        let mut report = SchedulerReport::default();
        let result = self.run_cycles(&mut report).await;

        self.state = SchedulerState::Stopping;
        debug!("Stopping collector after {} cycles", report.cycles);

        if let Err(e) = self.runner.store().close() {
            error!("Failed to close result store: {e}");
        }

        self.state = SchedulerState::Stopped;
        info!(
            "Collector stopped after {} cycles ({} results stored)",
            report.cycles, report.stored
        );

        result.map(|()| report)
    }

    async fn run_cycles(&mut self, report: &mut SchedulerReport) -> Result<()> {
        let mut consecutive_store_failures = 0u32;

        loop {
            if self.stop.is_stop_requested() {
                return Ok(());
            }

            let cycle_start = Instant::now();
            let outcome = self.runner.run_cycle().await;
            let cycle = outcome.cycle;

            if outcome.all_saves_failed() {
                consecutive_store_failures += 1;
            } else if outcome.stored_count() > 0 {
                consecutive_store_failures = 0;
            }
            report.record(outcome);

            if self.max_consecutive_store_failures > 0
                && consecutive_store_failures >= self.max_consecutive_store_failures
            {
                error!(
                    "Result store failed in {consecutive_store_failures} consecutive cycles; shutting down"
                );
                bail!("Result store unavailable for {consecutive_store_failures} consecutive cycles");
            }

            if let Some(max_cycles) = self.max_cycles {
                if report.cycles >= max_cycles {
                    return Ok(());
                }
            }

            if self.stop.is_stop_requested() {
                return Ok(());
            }

            let next_start = cycle_start + self.interval;
            let now = Instant::now();
            if next_start <= now {
                warn!(
                    "Cycle #{} took {:.1}s, longer than the {}s interval; starting the next cycle now",
                    cycle,
                    (now - cycle_start).as_secs_f64(),
                    self.interval.as_secs()
                );
            } else {
                debug!("Next cycle in {:.1}s", (next_start - now).as_secs_f64());
            }

            tokio::select! {
                _ = sleep_until(next_start) => {}
                _ = self.stop.stopped() => {}
            }
        }
    }
}
