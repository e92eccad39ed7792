//! Request-level queries over the loaded basin datasets.
//!
//! `BasinEngine` owns every read-only handle (configuration, catchment
//! registry, terrain mosaic, classifier, weather source) and answers the four
//! outbound queries: coverage, prediction, location check and forecast. The
//! `*_at` variants take the clock (and the sampler RNG) explicitly so tests
//! are deterministic.

use crate::alert::advisory::{ImpactSummary, advisory_text, impact_summary, return_period};
use crate::alert::classifier::RiskClassifier;
use crate::config::Config;
use crate::forecast::ForecastGenerator;
use crate::hydrology::discharge::{DischargeEstimator, DischargeInputs};
use crate::hydrology::runoff;
use crate::hydrology::stage::{StageResolver, StageResult};
use crate::ingest::WeatherSource;
use crate::logging::{self, DataSource};
use crate::model::{
    AssessmentPath, DischargeEstimate, FeatureVector, ForecastPoint, RiskLevel, RunoffPoint, WeatherSample,
};
use crate::registry::CatchmentRegistry;
use crate::simulation::SimulationInputs;
use crate::terrain::{TerrainMosaic, TileFootprint};
use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;
use serde::Serialize;

/// Where the weather snapshot of a prediction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherOrigin {
    Live,
    Defaults,
}

/// Result of a distributed prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub rainfall_input: f64,
    pub simulated: bool,
    pub weather_origin: WeatherOrigin,
    #[serde(flatten)]
    pub weather: WeatherSample,
    pub total_discharge_cusecs: f64,
    pub discharge: DischargeEstimate,
    pub impact: ImpactSummary,
    pub distributed_points: Vec<RunoffPoint>,
    pub return_period: &'static str,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub assessment_path: AssessmentPath,
    pub advisory: String,
}

/// Result of a single-point stage query.
#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub found: bool,
    /// Tile name on success, otherwise the miss reason.
    pub source: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(flatten)]
    pub stage: Option<StageResult>,
}

impl LocationReport {
    fn miss(lat: f64, lon: f64, reason: &str) -> Self {
        LocationReport {
            found: false,
            source: reason.to_string(),
            lat,
            lon,
            stage: None,
        }
    }
}

pub const INVALID_INPUT: &str = "Invalid";

pub struct BasinEngine<W> {
    config: Config,
    registry: CatchmentRegistry,
    mosaic: TerrainMosaic,
    classifier: RiskClassifier,
    weather: W,
    estimator: DischargeEstimator,
    stage: StageResolver,
    forecaster: ForecastGenerator,
    offset: FixedOffset,
}

impl<W: WeatherSource> BasinEngine<W> {
    pub fn new(
        config: Config,
        registry: CatchmentRegistry,
        mosaic: TerrainMosaic,
        classifier: RiskClassifier,
        weather: W,
    ) -> Self {
        let offset = config.weather.utc_offset();
        BasinEngine {
            estimator: DischargeEstimator::new(config.basin.clone()),
            stage: StageResolver::new(config.stage.clone()),
            forecaster: ForecastGenerator::new(config.basin.clone(), &config.risk, offset),
            offset,
            config,
            registry,
            mosaic,
            classifier,
            weather,
        }
    }

    /// Load every reference dataset named in `config`, degrading on failure.
    pub fn from_config(config: Config, weather: W) -> Self {
        let registry = CatchmentRegistry::load_or_empty(&config.data.catchment_points);
        let mosaic = TerrainMosaic::load_dir(&config.data.tiles_dir, config.data.mosaic_epsg).unwrap_or_else(|e| {
            logging::error(
                DataSource::Terrain,
                None,
                &format!("Mosaic disabled: {}", e),
            );
            TerrainMosaic::disabled()
        });
        let classifier = RiskClassifier::load_or_fallback(&config.data.model_path, config.risk.fallback);
        Self::new(config, registry, mosaic, classifier, weather)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &CatchmentRegistry {
        &self.registry
    }

    pub fn mosaic(&self) -> &TerrainMosaic {
        &self.mosaic
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    pub fn weather_source(&self) -> &W {
        &self.weather
    }

    // ------------------------------------------------------------------------
    // Coverage
    // ------------------------------------------------------------------------

    pub fn coverage(&self) -> Vec<TileFootprint> {
        self.mosaic.coverage()
    }

    // ------------------------------------------------------------------------
    // Prediction
    // ------------------------------------------------------------------------

    pub fn predict(&self, inputs: &SimulationInputs) -> PredictionReport {
        self.predict_at(inputs, Utc::now(), &mut rand::thread_rng())
    }

    pub fn predict_at<R: Rng + ?Sized>(
        &self,
        inputs: &SimulationInputs,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> PredictionReport {
        let (mut weather, weather_origin) = self.current_weather();
        inputs.apply(&mut weather);
        let release = inputs.release();

        let discharge = self.estimator.estimate(
            DischargeInputs {
                current_rain_mm: weather.rain_mm,
                antecedent_rain_mm: weather.antecedent_rain_mm,
                release_cusecs: release,
            },
            &now.with_timezone(&self.offset),
        );
        if discharge.degraded {
            logging::warn(
                DataSource::Engine,
                Some("discharge"),
                "Non-finite intermediate; reporting base flow only",
            );
        }
        let q = discharge.total_cusecs;

        let all_points = runoff::compute(&self.registry, weather.rain_mm);
        let impact = impact_summary(&all_points, q, &self.stage);
        let distributed_points =
            runoff::sample_points(all_points, self.config.output.max_distributed_points, rng);

        let assessment = self.classifier.classify(&FeatureVector {
            rain_mm: weather.rain_mm,
            soil_moisture: weather.soil_moisture,
            snow_depth: weather.snow_depth_m,
            antecedent_rain_mm: weather.antecedent_rain_mm,
            discharge_cusecs: q,
        });

        logging::debug(
            DataSource::Engine,
            Some("predict"),
            &format!(
                "rain {:.1} mm, antecedent {:.1} mm, Q {:.0} cusecs, level {} ({:?}), {} of {} points returned",
                weather.rain_mm,
                weather.antecedent_rain_mm,
                q,
                assessment.level.as_u8(),
                assessment.path,
                distributed_points.len(),
                impact.active_points
            ),
        );

        PredictionReport {
            rainfall_input: weather.rain_mm,
            simulated: !inputs.is_live(),
            weather_origin,
            total_discharge_cusecs: q,
            discharge,
            impact,
            distributed_points,
            return_period: return_period(weather.rain_mm),
            risk_level: assessment.level,
            confidence: assessment.confidence,
            assessment_path: assessment.path,
            advisory: advisory_text(assessment.level, &weather, release, self.config.basin.lag_hours),
            weather,
        }
    }

    /// Live snapshot over neutral defaults; a failed fetch keeps the defaults.
    fn current_weather(&self) -> (WeatherSample, WeatherOrigin) {
        let mut sample = WeatherSample::default();
        match self.weather.fetch_conditions() {
            Ok(conditions) => {
                conditions.apply_to(&mut sample);
                (sample, WeatherOrigin::Live)
            }
            Err(e) => {
                logging::log_weather_failure("current conditions", &e);
                (sample, WeatherOrigin::Defaults)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Location check
    // ------------------------------------------------------------------------

    /// Stage at a WGS84 point for a given basin discharge.
    pub fn check_location(&self, lat: f64, lon: f64, discharge_cusecs: f64) -> LocationReport {
        let valid = lat.is_finite()
            && lon.is_finite()
            && discharge_cusecs.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if !valid {
            return LocationReport::miss(lat, lon, INVALID_INPUT);
        }

        let lat = round_to(lat, 4);
        let lon = round_to(lon, 4);

        match self.mosaic.elevation_at(lat, lon) {
            Ok(elevation) => LocationReport {
                found: true,
                source: elevation.tile_name,
                lat,
                lon,
                stage: Some(self.stage.resolve(elevation.meters, discharge_cusecs)),
            },
            Err(miss) => LocationReport::miss(lat, lon, miss.reason()),
        }
    }

    // ------------------------------------------------------------------------
    // Forecast
    // ------------------------------------------------------------------------

    /// 12-hour outlook: synthetic when a peak rain is given, live otherwise.
    pub fn forecast(&self, synthetic_peak_mm: Option<f64>) -> Vec<ForecastPoint> {
        self.forecast_at(synthetic_peak_mm, Utc::now())
    }

    pub fn forecast_at(&self, synthetic_peak_mm: Option<f64>, now: DateTime<Utc>) -> Vec<ForecastPoint> {
        match synthetic_peak_mm {
            Some(peak) => self.forecaster.synthetic_at(peak, now),
            None => self.forecaster.live_at(&self.weather, now),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
