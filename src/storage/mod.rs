pub mod measurement_storage;
pub mod schema;

pub use measurement_storage::SqliteStore;

use crate::errors::StoreError;
use crate::models::MeasurementResult;

/// Durable, append-only sink for accepted measurements
///
/// Implementations must tolerate `save` being called from several tasks at
/// once, either by serializing internally or by relying on atomic inserts.
pub trait ResultStore: Send + Sync {
    /// Inserts one result. There is no update or delete counterpart.
    fn save(&self, result: &MeasurementResult) -> Result<(), StoreError>;

    /// Releases the underlying connection. Calling it again must not fail.
    fn close(&self) -> Result<(), StoreError>;
}
