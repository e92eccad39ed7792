//! 12-hour discharge and risk outlook.
//!
//! Two modes feed the same per-hour pipeline (discharge estimator followed by
//! the forecast threshold rule; the trained model is not consulted):
//!
//! - **Live**: hourly rain from the weather source, sliced from the current
//!   local hour. Antecedent rain is the 120 hours before that hour.
//! - **Synthetic**: a storm hydrograph shaped from a peak rain value, with a
//!   fixed illustrative antecedent.
//!
//! An upstream failure in live mode yields an all-zero rain series; the
//! sequence is always exactly [`FORECAST_HOURS`] long.

use crate::alert::thresholds::classify_discharge;
use crate::config::{BasinConfig, DischargeThresholds, RiskConfig};
use crate::hydrology::discharge::{DischargeEstimator, DischargeInputs};
use crate::ingest::{ANTECEDENT_WINDOW_HOURS, WeatherSource};
use crate::logging;
use crate::model::ForecastPoint;
use chrono::{DateTime, Duration, FixedOffset, Utc};

pub const FORECAST_HOURS: usize = 12;

/// Rising limb, peak, then exponential recession.
pub fn synthetic_factor(hour: usize) -> f64 {
    match hour {
        0 => 0.2,
        1 => 0.6,
        2 => 1.0,
        3 => 0.8,
        h => 0.8 * 0.75_f64.powi(h as i32 - 3),
    }
}

pub fn synthetic_rain(peak_rain_mm: f64) -> Vec<f64> {
    let peak = if peak_rain_mm.is_finite() { peak_rain_mm.max(0.0) } else { 0.0 };
    (0..FORECAST_HOURS).map(|h| peak * synthetic_factor(h)).collect()
}

pub struct ForecastGenerator {
    estimator: DischargeEstimator,
    thresholds: DischargeThresholds,
    synthetic_antecedent_mm: f64,
    offset: FixedOffset,
}

impl ForecastGenerator {
    /// `offset` is the basin's local time, used for hour labels and season.
    pub fn new(basin: BasinConfig, risk: &RiskConfig, offset: FixedOffset) -> Self {
        ForecastGenerator {
            estimator: DischargeEstimator::new(basin),
            thresholds: risk.forecast,
            synthetic_antecedent_mm: risk.synthetic_antecedent_mm,
            offset,
        }
    }

    /// Synthetic outlook for a storm peaking at `peak_rain_mm`.
    pub fn synthetic_at(&self, peak_rain_mm: f64, now: DateTime<Utc>) -> Vec<ForecastPoint> {
        self.build(&synthetic_rain(peak_rain_mm), self.synthetic_antecedent_mm, now)
    }

    /// Live outlook from the source's hourly rain.
    pub fn live_at<W: WeatherSource + ?Sized>(&self, source: &W, now: DateTime<Utc>) -> Vec<ForecastPoint> {
        let local_now = now.with_timezone(&self.offset).naive_local();

        let (rains, antecedent) = match source.fetch_hourly_rain() {
            Ok(hourly) => match hourly.index_of_hour(local_now) {
                Some(index) => (
                    hourly.window(index, FORECAST_HOURS),
                    hourly.sum_before(index, ANTECEDENT_WINDOW_HOURS),
                ),
                None => {
                    logging::warn(
                        logging::DataSource::Weather,
                        Some("hourly rain"),
                        "Current hour not in hourly series; forecasting with zero rain",
                    );
                    (vec![0.0; FORECAST_HOURS], 0.0)
                }
            },
            Err(e) => {
                logging::log_weather_failure("hourly rain", &e);
                (vec![0.0; FORECAST_HOURS], 0.0)
            }
        };

        self.build(&rains, antecedent, now)
    }

    fn build(&self, rains: &[f64], antecedent_rain_mm: f64, now: DateTime<Utc>) -> Vec<ForecastPoint> {
        let local_now = now.with_timezone(&self.offset);

        (0..FORECAST_HOURS)
            .map(|h| {
                let rain = rains.get(h).copied().unwrap_or(0.0);
                let at = local_now + Duration::hours(h as i64);
                let discharge = self
                    .estimator
                    .estimate(
                        DischargeInputs {
                            current_rain_mm: rain,
                            antecedent_rain_mm,
                            release_cusecs: 0.0,
                        },
                        &at,
                    )
                    .total_cusecs;

                ForecastPoint {
                    hour_offset: h as u32,
                    time: at.format("%H:%M").to_string(),
                    rain: (rain * 10.0).round() / 10.0,
                    discharge,
                    risk: classify_discharge(discharge, self.thresholds),
                }
            })
            .collect()
    }
}
