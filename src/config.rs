/// Service configuration loaded from basin.toml
///
/// Every section carries the calibrated defaults for the basin, so a missing
/// or partial file still yields a working configuration. The file location
/// comes from `BASIN_CONFIG` (read through `.env` when present).

use crate::model::ConfigError;
use crate::terrain::reproject::Projection;
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "basin.toml";
pub const CONFIG_PATH_ENV: &str = "BASIN_CONFIG";

// ============================================================================
// TOML Configuration Structures
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub weather: WeatherConfig,
    pub basin: BasinConfig,
    pub stage: StageConfig,
    pub risk: RiskConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Locations of the read-only reference datasets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub catchment_points: PathBuf,
    pub tiles_dir: PathBuf,
    pub model_path: PathBuf,
    /// Projected CRS shared by every tile in the mosaic.
    pub mosaic_epsg: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            catchment_points: PathBuf::from("catchment_points.csv"),
            tiles_dir: PathBuf::from("tiles"),
            model_path: PathBuf::from("flood_model.json"),
            mosaic_epsg: 32644,
        }
    }
}

/// Upstream weather source (Open-Meteo forecast API).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    /// Offset of `timezone` from UTC, used for hour labels and season lookup.
    pub utc_offset_minutes: i32,
    pub timeout_secs: u64,
    pub past_days: u32,
    pub forecast_days: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            latitude: 29.956,
            longitude: 78.18,
            timezone: "Asia/Kolkata".to_string(),
            utc_offset_minutes: 330,
            timeout_secs: 2,
            past_days: 5,
            forecast_days: 2,
        }
    }
}

impl WeatherConfig {
    /// Fixed offset of the basin's local time; out-of-range values fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }
}

/// Basin-wide rainfall-runoff calibration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BasinConfig {
    pub area_sq_km: f64,
    /// Single basin-representative SCS curve number.
    pub curve_number: f64,
    /// Share of the antecedent rain sum that still drains into the river.
    pub antecedent_fraction: f64,
    pub base_flow: SeasonalBaseFlow,
    /// Typical hours from peak rain to peak river stage, quoted in advisories.
    pub lag_hours: u32,
}

impl Default for BasinConfig {
    fn default() -> Self {
        BasinConfig {
            area_sq_km: 20_000.0,
            curve_number: 80.0,
            antecedent_fraction: 0.15,
            base_flow: SeasonalBaseFlow::default(),
            lag_hours: 6,
        }
    }
}

/// Base flow per seasonal band, in cusecs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeasonalBaseFlow {
    /// June - September
    pub monsoon: f64,
    /// October - November
    pub post_monsoon: f64,
    /// December - February
    pub winter: f64,
    /// March - May (snow and glacier melt)
    pub pre_summer_melt: f64,
}

impl Default for SeasonalBaseFlow {
    fn default() -> Self {
        SeasonalBaseFlow {
            monsoon: 17_655.0,
            post_monsoon: 8_828.0,
            winter: 5_297.0,
            pre_summer_melt: 10_593.0,
        }
    }
}

/// Rating curve and channel reference elevations at the reach.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub base_channel_level_m: f64,
    /// Cusecs of discharge per metre of water-surface rise.
    pub rise_divisor: f64,
    pub active_channel_m: f64,
    pub deep_channel_m: f64,
    pub max_depth_proxy_m: f64,
    pub min_visible_flow: f64,
}

impl Default for StageConfig {
    fn default() -> Self {
        StageConfig {
            base_channel_level_m: 292.5,
            rise_divisor: 50_000.0,
            active_channel_m: 294.0,
            deep_channel_m: 293.5,
            max_depth_proxy_m: 5.0,
            min_visible_flow: 100.0,
        }
    }
}

/// Discharge cutoffs for the deterministic risk rules.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DischargeThresholds {
    pub warning_cusecs: f64,
    pub critical_cusecs: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Used when the trained model is absent or fails.
    pub fallback: DischargeThresholds,
    /// Used for every hour of the forecast.
    pub forecast: DischargeThresholds,
    /// Antecedent rain assumed by the synthetic forecast hydrograph.
    pub synthetic_antecedent_mm: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            fallback: DischargeThresholds {
                warning_cusecs: 100_000.0,
                critical_cusecs: 180_000.0,
            },
            forecast: DischargeThresholds {
                warning_cusecs: 150_000.0,
                critical_cusecs: 250_000.0,
            },
            synthetic_antecedent_mm: 40.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Maximum number of distributed points returned per prediction.
    pub max_distributed_points: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            max_distributed_points: 2500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of "debug", "info", "warn", "error".
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Load the configuration from a TOML file and validate it.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Resolve the configuration path from the environment (`.env` included).
pub fn config_path_from_env() -> PathBuf {
    dotenv::dotenv().ok();
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl Config {
    /// Rejects calibrations that would make the hydrology meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cn = self.basin.curve_number;
        if !(cn > 0.0 && cn <= 100.0) {
            return Err(ConfigError::Invalid(format!(
                "basin.curve_number must be in (0, 100], got {}",
                cn
            )));
        }
        if !(self.basin.area_sq_km > 0.0) {
            return Err(ConfigError::Invalid("basin.area_sq_km must be positive".into()));
        }
        let flow = &self.basin.base_flow;
        for (band, value) in [
            ("monsoon", flow.monsoon),
            ("post_monsoon", flow.post_monsoon),
            ("winter", flow.winter),
            ("pre_summer_melt", flow.pre_summer_melt),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "basin.base_flow.{} must be a non-negative number, got {}",
                    band, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.basin.antecedent_fraction) {
            return Err(ConfigError::Invalid(
                "basin.antecedent_fraction must be in [0, 1]".into(),
            ));
        }
        if !(self.stage.rise_divisor > 0.0) || !(self.stage.max_depth_proxy_m > 0.0) {
            return Err(ConfigError::Invalid(
                "stage.rise_divisor and stage.max_depth_proxy_m must be positive".into(),
            ));
        }
        for (name, t) in [("fallback", self.risk.fallback), ("forecast", self.risk.forecast)] {
            if t.warning_cusecs > t.critical_cusecs {
                return Err(ConfigError::Invalid(format!(
                    "risk.{}: warning threshold must not exceed critical threshold",
                    name
                )));
            }
        }
        if let Err(e) = Projection::from_epsg(self.data.mosaic_epsg) {
            return Err(ConfigError::Invalid(format!("data.mosaic_epsg: {}", e)));
        }
        if self.output.max_distributed_points == 0 {
            return Err(ConfigError::Invalid(
                "output.max_distributed_points must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
