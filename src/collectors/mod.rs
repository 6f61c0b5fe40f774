//! Measurement collection
//!
//! - `cycle`: runs every provider once, validating and storing each result as it completes
//! - `scheduler`: repeats cycles at a fixed rate until stopped
//! - `shutdown`: cooperative stop signal and OS signal listener
//! - `validation`: sanity bounds applied before a result is stored

pub mod cycle;
pub mod scheduler;
pub mod shutdown;
pub mod validation;

pub use cycle::{CycleOutcome, CycleRunner, OutcomeStatus, ProviderOutcome};
pub use scheduler::{Scheduler, SchedulerReport, SchedulerState};
pub use shutdown::{StopSignal, spawn_signal_listener};
pub use validation::{RejectionReason, Verdict, validate};

#[cfg(test)]
pub mod tests;
