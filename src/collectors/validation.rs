//! Sanity validation for measurement results
//!
//! Rejection is an expected outcome for implausible readings, not an error,
//! so the validator returns a [`Verdict`] instead of a `Result`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{MeasurementResult, ValidationBounds};

/// Why a result was not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// A value is NaN or infinite
    NonFinite,
    /// Download, upload or latency is below zero
    NegativeValue,
    /// Download or upload exceeds its configured bound
    OutlierExceedsBound,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::NonFinite => "non-finite value",
            RejectionReason::NegativeValue => "negative value",
            RejectionReason::OutlierExceedsBound => "outlier exceeds bound",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectionReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Applies the sanity rules in order; the first matching rule decides
///
/// # Validation Rules
///
/// 1. **Finite values**: download, upload and latency must not be NaN or infinite
/// 2. **Non-negative values**: none of the three may be below zero
/// 3. **Bounds**: download and upload must not exceed their bound (equal is fine)
pub fn validate(result: &MeasurementResult, bounds: &ValidationBounds) -> Verdict {
    let values = [result.download_mbps, result.upload_mbps, result.latency_ms];

    if values.iter().any(|v| !v.is_finite()) {
        return Verdict::Rejected(RejectionReason::NonFinite);
    }

    if values.iter().any(|v| *v < 0.0) {
        return Verdict::Rejected(RejectionReason::NegativeValue);
    }

    if result.download_mbps > bounds.max_download_mbps || result.upload_mbps > bounds.max_upload_mbps {
        return Verdict::Rejected(RejectionReason::OutlierExceedsBound);
    }

    Verdict::Accepted
}
