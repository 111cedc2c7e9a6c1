use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Thresholds shared by every per-cluster computation.
///
/// Passed by reference into each analyzer; nothing reads it from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Returns below this height above ground (m) are ignored.
    pub hag_min: f64,
    /// Length/width ratio above which a cluster is flagged elongated.
    pub elongation_threshold: f64,
    /// Maximum height above ground (m) below which a cluster is flagged low.
    pub low_height_threshold: f64,
    /// Decimal places kept in `cwd_score`.
    pub score_decimals: u32,
    /// Clusters smaller than this area (m²) are left out of the table.
    pub min_area_m2: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            hag_min: 0.1,
            elongation_threshold: 3.0,
            low_height_threshold: 1.5,
            score_decimals: 3,
            min_area_m2: 0.0,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.hag_min.is_finite() {
            return Err(CoreError::InvalidConfig(format!(
                "hag_min must be finite, got {}",
                self.hag_min
            )));
        }
        if !self.elongation_threshold.is_finite() || self.elongation_threshold < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "elongation_threshold must be a non-negative number, got {}",
                self.elongation_threshold
            )));
        }
        if !self.low_height_threshold.is_finite() || self.low_height_threshold <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "low_height_threshold must be positive, got {}",
                self.low_height_threshold
            )));
        }
        if self.score_decimals > 15 {
            return Err(CoreError::InvalidConfig(format!(
                "score_decimals must be at most 15, got {}",
                self.score_decimals
            )));
        }
        if !self.min_area_m2.is_finite() || self.min_area_m2 < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "min_area_m2 must be a non-negative number, got {}",
                self.min_area_m2
            )));
        }
        Ok(())
    }
}
