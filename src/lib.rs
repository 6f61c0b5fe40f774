//! Periodic internet speed collection
//!
//! Runs the configured speed providers concurrently at a fixed rate, rejects
//! implausible results and appends the rest to a SQLite database.

pub mod collectors;
pub mod config;
pub mod errors;
pub mod models;
pub mod providers;
pub mod storage;

pub use collectors::{CycleRunner, Scheduler, StopSignal};
pub use config::AppConfig;
pub use errors::{ProviderError, StoreError};
pub use models::{MeasurementResult, Provider, ValidationBounds};
pub use storage::{ResultStore, SqliteStore};
