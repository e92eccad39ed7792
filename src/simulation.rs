/// What-if overrides for a prediction.
///
/// The live snapshot is always fetched first; any value given here then
/// replaces the live one. Release volume has no live counterpart and only
/// enters through this path.

use crate::model::WeatherSample;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimulationInputs {
    /// Basin rain (mm) replacing the live current rain.
    pub rain_mm: Option<f64>,
    /// Soil moisture fraction (0.0 - 1.0) replacing the live reading.
    pub soil_moisture: Option<f64>,
    /// 5-day antecedent rain sum (mm) replacing the live history.
    pub antecedent_rain_mm: Option<f64>,
    /// Upstream reservoir release added to discharge, in cusecs.
    pub release_cusecs: Option<f64>,
}

impl SimulationInputs {
    /// Only a rain override.
    pub fn rain(rain_mm: f64) -> Self {
        SimulationInputs {
            rain_mm: Some(rain_mm),
            ..Self::default()
        }
    }

    pub fn is_live(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the overrides onto a live (or default) snapshot.
    ///
    /// Negative and non-finite overrides are clamped to zero; soil moisture
    /// is clamped to [0, 1].
    pub fn apply(&self, sample: &mut WeatherSample) {
        if let Some(rain) = self.rain_mm {
            sample.rain_mm = non_negative(rain);
        }
        if let Some(soil) = self.soil_moisture {
            sample.soil_moisture = non_negative(soil).min(1.0);
        }
        if let Some(antecedent) = self.antecedent_rain_mm {
            sample.antecedent_rain_mm = non_negative(antecedent);
        }
    }

    pub fn release(&self) -> f64 {
        self.release_cusecs.map(non_negative).unwrap_or(0.0)
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}
