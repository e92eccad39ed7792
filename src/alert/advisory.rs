//! Human-facing outputs of a prediction: return-period label, advisory text
//! and impact estimates.

use crate::hydrology::stage::StageResolver;
use crate::model::{RiskLevel, RunoffPoint, RunoffStatus, WeatherSample};
use serde::Serialize;

/// Antecedent rain above this is called out in advisories.
pub const SIGNIFICANT_ANTECEDENT_MM: f64 = 25.0;

/// Gumbel-style return-period label for a rainfall depth (mm).
pub fn return_period(rain_mm: f64) -> &'static str {
    if rain_mm < 10.0 {
        "Normal"
    } else if rain_mm < 80.0 {
        "1-in-2 Year Event"
    } else if rain_mm < 150.0 {
        "1-in-10 Year Event"
    } else if rain_mm < 250.0 {
        "1-in-50 Year Event"
    } else {
        "1-in-100 Year Extreme Event"
    }
}

/// Advisory text for a risk level and the conditions behind it.
pub fn advisory_text(level: RiskLevel, weather: &WeatherSample, release_cusecs: f64, lag_hours: u32) -> String {
    let antecedent = weather.antecedent_rain_mm;
    match level {
        RiskLevel::Normal => "Normal Flow.".to_string(),
        RiskLevel::Warning => {
            let mut text = "WARNING: Elevated runoff due to wet soil conditions.".to_string();
            if antecedent > SIGNIFICANT_ANTECEDENT_MM {
                text.push_str(&format!(
                    " {:.0} mm of rain over the past 5 days keeps the catchment primed.",
                    antecedent
                ));
            }
            text
        }
        RiskLevel::Critical => {
            let saturation = (weather.soil_moisture * 100.0).clamp(0.0, 100.0) as i64;
            let mut text = format!(
                "CRITICAL: High Saturation ({}%) detected. Flash flood imminent. Peak stage expected within ~{} h.",
                saturation, lag_hours
            );
            if antecedent > SIGNIFICANT_ANTECEDENT_MM {
                text.push_str(&format!(" Antecedent rain: {:.0} mm over 5 days.", antecedent));
            }
            if release_cusecs > 0.0 {
                text.push_str(&format!(" Upstream release adds {:.0} cusecs.", release_cusecs));
            }
            text
        }
    }
}

/// Counts of the distributed points and the headline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactSummary {
    pub active_points: usize,
    pub elevated_points: usize,
    pub high_points: usize,
    pub water_surface_m: f64,
    pub stage_rise_m: f64,
}

/// Summarise the full (unsampled) distributed result and the rating-curve stage.
pub fn impact_summary(points: &[RunoffPoint], discharge_cusecs: f64, stage: &StageResolver) -> ImpactSummary {
    let count = |status: RunoffStatus| points.iter().filter(|p| p.status == status).count();
    let surface = stage.water_surface(discharge_cusecs);
    let base = stage.water_surface(0.0);

    ImpactSummary {
        active_points: points.len(),
        elevated_points: count(RunoffStatus::Elevated),
        high_points: count(RunoffStatus::High),
        water_surface_m: (surface * 100.0).round() / 100.0,
        stage_rise_m: ((surface - base) * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;

    #[test]
    fn test_return_period_bands() {
        assert_eq!(return_period(0.0), "Normal");
        assert_eq!(return_period(9.99), "Normal");
        assert_eq!(return_period(10.0), "1-in-2 Year Event");
        assert_eq!(return_period(80.0), "1-in-10 Year Event");
        assert_eq!(return_period(150.0), "1-in-50 Year Event");
        assert_eq!(return_period(250.0), "1-in-100 Year Extreme Event");
    }

    #[test]
    fn test_normal_advisory() {
        let text = advisory_text(RiskLevel::Normal, &WeatherSample::default(), 0.0, 6);
        assert_eq!(text, "Normal Flow.");
    }

    #[test]
    fn test_warning_mentions_antecedent_only_when_significant() {
        let mut w = WeatherSample::default();
        let dry = advisory_text(RiskLevel::Warning, &w, 0.0, 6);
        assert!(!dry.contains("past 5 days"));

        w.antecedent_rain_mm = 60.0;
        let wet = advisory_text(RiskLevel::Warning, &w, 0.0, 6);
        assert!(wet.starts_with("WARNING"));
        assert!(wet.contains("60 mm"), "got '{}'", wet);
    }

    #[test]
    fn test_critical_advisory_carries_saturation_lag_and_release() {
        let w = WeatherSample {
            soil_moisture: 0.45,
            antecedent_rain_mm: 80.0,
            ..WeatherSample::default()
        };
        let text = advisory_text(RiskLevel::Critical, &w, 30_000.0, 6);
        assert!(text.contains("High Saturation (45%)"), "got '{}'", text);
        assert!(text.contains("~6 h"));
        assert!(text.contains("80 mm"));
        assert!(text.contains("30000 cusecs"));
    }

    #[test]
    fn test_impact_summary_counts_and_stage() {
        let p = |status| RunoffPoint {
            lat: 0.0,
            lon: 0.0,
            runoff_mm: 20.0,
            status,
            elevation: 300.0,
        };
        let points = vec![p(RunoffStatus::Normal), p(RunoffStatus::Elevated), p(RunoffStatus::High), p(RunoffStatus::High)];
        let summary = impact_summary(&points, 100_000.0, &StageResolver::new(StageConfig::default()));
        assert_eq!(summary.active_points, 4);
        assert_eq!(summary.elevated_points, 1);
        assert_eq!(summary.high_points, 2);
        assert_eq!(summary.water_surface_m, 294.5);
        assert_eq!(summary.stage_rise_m, 2.0);
    }
}
