/// Upstream weather ingestion.
///
/// `WeatherSource` is the seam between the engine and the live API; the
/// engine only ever sees `CurrentConditions` and `HourlyRain`, so tests can
/// drive it with a stub source.

pub mod open_meteo;

use crate::model::{WeatherError, WeatherSample};
use chrono::{NaiveDateTime, Timelike};

/// Hours of rain summed into the antecedent term (5 days).
pub const ANTECEDENT_WINDOW_HOURS: usize = 120;

/// An upstream provider of basin weather.
pub trait WeatherSource {
    /// Current conditions plus the hourly rain history around now.
    fn fetch_conditions(&self) -> Result<CurrentConditions, WeatherError>;

    /// Hourly rain (rain + showers) covering past days and the forecast window.
    fn fetch_hourly_rain(&self) -> Result<HourlyRain, WeatherError>;
}

/// Hourly rain series in basin-local time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyRain {
    pub times: Vec<NaiveDateTime>,
    pub rain_mm: Vec<f64>,
}

impl HourlyRain {
    pub fn len(&self) -> usize {
        self.rain_mm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rain_mm.is_empty()
    }

    /// Index of the hour containing `at`.
    pub fn index_of_hour(&self, at: NaiveDateTime) -> Option<usize> {
        let hour = at.with_minute(0)?.with_second(0)?.with_nanosecond(0)?;
        self.times.iter().position(|t| *t == hour)
    }

    /// Sum of the `window` hours before `current`; zero when fewer are available.
    pub fn sum_before(&self, current: usize, window: usize) -> f64 {
        if current < window || current > self.rain_mm.len() {
            return 0.0;
        }
        self.rain_mm[current - window..current]
            .iter()
            .map(|r| r.max(0.0))
            .sum()
    }

    /// `len` hours starting at `start`, zero-padded past the end of the series.
    pub fn window(&self, start: usize, len: usize) -> Vec<f64> {
        (start..start + len)
            .map(|i| self.rain_mm.get(i).copied().unwrap_or(0.0).max(0.0))
            .collect()
    }
}

/// One reading of current conditions; `None` marks a value the source left null.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub time: NaiveDateTime,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub snow_depth_m: Option<f64>,
    /// Rain plus showers over the current interval.
    pub rain_mm: Option<f64>,
    pub hourly: HourlyRain,
}

impl CurrentConditions {
    pub fn antecedent_rain_mm(&self) -> f64 {
        self.hourly
            .index_of_hour(self.time)
            .map(|i| self.hourly.sum_before(i, ANTECEDENT_WINDOW_HOURS))
            .unwrap_or(0.0)
    }

    /// Overwrite the fields of `sample` the source actually reported.
    pub fn apply_to(&self, sample: &mut WeatherSample) {
        if let Some(v) = self.temperature_c {
            sample.temperature_c = v;
        }
        if let Some(v) = self.humidity_pct {
            sample.humidity_pct = v;
        }
        if let Some(v) = self.wind_speed_kmh {
            sample.wind_speed_kmh = v;
        }
        if let Some(v) = self.soil_moisture {
            sample.soil_moisture = v;
        }
        if let Some(v) = self.snow_depth_m {
            sample.snow_depth_m = v;
        }
        if let Some(v) = self.rain_mm {
            sample.rain_mm = v;
        }
        sample.antecedent_rain_mm = self.antecedent_rain_mm();
    }
}
