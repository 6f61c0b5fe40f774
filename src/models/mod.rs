pub mod measurement;

pub use measurement::{MeasurementResult, Provider, ValidationBounds};
