//! Error types shared by providers and storage

use thiserror::Error;

use crate::models::Provider;

/// A measurement attempt failed
///
/// Every fault inside a provider (network, parse, external tool) ends up here,
/// so a failing provider only ever removes its own result from a cycle.
#[derive(Debug, Clone, Error)]
#[error("{provider} failed: {cause}")]
pub struct ProviderError {
    pub provider: Provider,
    pub cause: String,
}

impl ProviderError {
    pub fn new(provider: Provider, cause: impl Into<String>) -> Self {
        Self {
            provider,
            cause: cause.into(),
        }
    }
}

/// Persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store is closed")]
    Closed,
}
