//! Discharge threshold rule.
//!
//! The deterministic rule used by the forecast for every hour and by the
//! classifier whenever the trained model cannot answer.

use crate::config::DischargeThresholds;
use crate::model::RiskLevel;

/// Risk level for a discharge; each cutoff must be strictly exceeded.
///
/// A non-finite discharge is treated as `Normal` rather than propagated.
pub fn classify_discharge(discharge_cusecs: f64, thresholds: DischargeThresholds) -> RiskLevel {
    if !discharge_cusecs.is_finite() {
        return RiskLevel::Normal;
    }
    if discharge_cusecs > thresholds.critical_cusecs {
        RiskLevel::Critical
    } else if discharge_cusecs > thresholds.warning_cusecs {
        RiskLevel::Warning
    } else {
        RiskLevel::Normal
    }
}
