use serde::{Deserialize, Serialize};

/// Logistic remap of raw similarity onto 0–100.
///
/// `100 / (1 + e^(-steepness * (s - midpoint)))` with `s` clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub steepness: f64,
    pub midpoint: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            steepness: 15.0,
            midpoint: 0.65,
        }
    }
}

impl CalibrationConfig {
    pub fn calibrate(&self, raw: f64) -> f64 {
        calibrate(raw, self)
    }
}

/// Calibrated 0–100 score for a raw similarity. Non-finite input scores 0.
pub fn calibrate(raw: f64, config: &CalibrationConfig) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    let s = raw.clamp(0.0, 1.0);
    100.0 / (1.0 + (-config.steepness * (s - config.midpoint)).exp())
}
