/// Core data types for the basin flood risk service.
///
/// This module defines the shared domain model imported by all other modules:
/// catchment points, weather snapshots, discharge estimates, risk levels,
/// forecast points, and the error types raised at each external boundary.
/// It contains no I/O and no hydrology, only types.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

/// Cubic feet per second in one cubic metre per second.
pub const CUSECS_PER_CUMEC: f64 = 35.31;

// ---------------------------------------------------------------------------
// Catchment points
// ---------------------------------------------------------------------------

/// A single basin sample point with its SCS curve-number constants.
///
/// `retention_mm` (S) and `initial_abstraction_mm` (Ia) are computed once
/// when the registry is loaded and never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchmentPoint {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub elevation_m: f64,
    pub curve_number: f64,
    pub rain_weight: f64,
    pub retention_mm: f64,
    pub initial_abstraction_mm: f64,
}

/// Runoff severity of a single catchment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub enum RunoffStatus {
    Normal,
    Elevated,
    High,
}

impl From<RunoffStatus> for u8 {
    fn from(status: RunoffStatus) -> u8 {
        match status {
            RunoffStatus::Normal => 0,
            RunoffStatus::Elevated => 1,
            RunoffStatus::High => 2,
        }
    }
}

/// One entry of the distributed runoff result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunoffPoint {
    pub lat: f64,
    pub lon: f64,
    pub runoff_mm: f64,
    pub status: RunoffStatus,
    pub elevation: f64,
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Weather snapshot used for a single request.
///
/// Starts from neutral defaults, is filled from the live upstream source
/// when it answers, and is finally overridden by any simulation inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSample {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_kmh: f64,
    /// Volumetric soil moisture fraction (0.0 - 1.0).
    pub soil_moisture: f64,
    pub snow_depth_m: f64,
    pub rain_mm: f64,
    /// Rolling 5-day antecedent rain sum.
    pub antecedent_rain_mm: f64,
}

impl Default for WeatherSample {
    fn default() -> Self {
        WeatherSample {
            temperature_c: 25.0,
            humidity_pct: 60.0,
            wind_speed_kmh: 5.0,
            soil_moisture: 0.2,
            snow_depth_m: 0.0,
            rain_mm: 0.0,
            antecedent_rain_mm: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Discharge and risk
// ---------------------------------------------------------------------------

/// Basin discharge in cusecs, with the components that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DischargeEstimate {
    pub total_cusecs: f64,
    pub base_flow_cusecs: f64,
    pub direct_runoff_cusecs: f64,
    pub delayed_runoff_cusecs: f64,
    pub release_cusecs: f64,
    /// True when a non-finite intermediate forced the base-flow-only result.
    pub degraded: bool,
}

/// Discrete flood risk level, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub enum RiskLevel {
    Normal,
    Warning,
    Critical,
}

impl RiskLevel {
    /// Maps a classifier class label onto a risk level.
    pub fn from_class(class: i64) -> Option<RiskLevel> {
        match class {
            0 => Some(RiskLevel::Normal),
            1 => Some(RiskLevel::Warning),
            2 => Some(RiskLevel::Critical),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self.into()
    }
}

impl From<RiskLevel> for u8 {
    fn from(level: RiskLevel) -> u8 {
        match level {
            RiskLevel::Normal => 0,
            RiskLevel::Warning => 1,
            RiskLevel::Critical => 2,
        }
    }
}

/// Which branch of the classifier produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentPath {
    Model,
    Fallback,
}

/// Result of classifying one feature vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Top class probability as a percentage; 0 on the fallback path.
    pub confidence: f64,
    pub path: AssessmentPath,
}

/// The five model inputs, in the order the classifier was trained on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub rain_mm: f64,
    pub soil_moisture: f64,
    pub snow_depth: f64,
    pub antecedent_rain_mm: f64,
    pub discharge_cusecs: f64,
}

impl FeatureVector {
    pub const LEN: usize = 5;

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.rain_mm,
            self.soil_moisture,
            self.snow_depth,
            self.antecedent_rain_mm,
            self.discharge_cusecs,
        ]
    }
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

/// One hour of the 12-hour outlook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub hour_offset: u32,
    /// Wall-clock label, e.g. "14:00".
    pub time: String,
    pub rain: f64,
    pub discharge: f64,
    pub risk: RiskLevel,
}

// ---------------------------------------------------------------------------
// Terrain lookups
// ---------------------------------------------------------------------------

/// Why an elevation lookup produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationMiss {
    /// The mosaic has no tiles loaded at all.
    NoTiles,
    /// Tiles are loaded but none holds a plausible value at the point.
    OutsideCoverage,
}

impl ElevationMiss {
    /// Reason string reported to callers.
    pub fn reason(&self) -> &'static str {
        match self {
            ElevationMiss::NoTiles => "No Tiles",
            ElevationMiss::OutsideCoverage => "Outside",
        }
    }
}

impl std::fmt::Display for ElevationMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A successful elevation lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Elevation {
    pub meters: f64,
    pub tile_name: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching data from the upstream weather source.
#[derive(Debug, PartialEq)]
pub enum WeatherError {
    /// Non-2xx HTTP response.
    HttpError(u16),
    /// Connection, TLS or timeout failure.
    Transport(String),
    /// The response body could not be deserialized.
    ParseError(String),
    /// A field the service depends on was absent or null.
    MissingField(&'static str),
}

impl std::fmt::Display for WeatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherError::HttpError(code) => write!(f, "HTTP error: {}", code),
            WeatherError::Transport(msg) => write!(f, "Transport error: {}", msg),
            WeatherError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            WeatherError::MissingField(field) => write!(f, "Missing field: {}", field),
        }
    }
}

impl std::error::Error for WeatherError {}

/// Errors raised while loading the catchment point dataset.
#[derive(Debug)]
pub enum RegistryError {
    Io(std::io::Error),
    Csv(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Io(e) => write!(f, "I/O error: {}", e),
            RegistryError::Csv(msg) => write!(f, "CSV error: {}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(e: std::io::Error) -> Self {
        RegistryError::Io(e)
    }
}

impl From<csv::Error> for RegistryError {
    fn from(e: csv::Error) -> Self {
        RegistryError::Csv(e.to_string())
    }
}

/// Errors raised while loading an elevation tile.
#[derive(Debug)]
pub enum TerrainError {
    Io(std::io::Error),
    Decode(String),
    /// The file has no usable pixel-scale/tiepoint or transformation tags.
    MissingGeoreference(String),
    /// The tile is in a CRS the mosaic cannot project into.
    CrsMismatch { tile: String, epsg: u32, expected: u32 },
    UnsupportedCrs(u32),
}

impl std::fmt::Display for TerrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerrainError::Io(e) => write!(f, "I/O error: {}", e),
            TerrainError::Decode(msg) => write!(f, "TIFF decode error: {}", msg),
            TerrainError::MissingGeoreference(tile) => {
                write!(f, "No georeferencing tags in {}", tile)
            }
            TerrainError::CrsMismatch { tile, epsg, expected } => write!(
                f,
                "Tile {} is in EPSG:{}, mosaic expects EPSG:{}",
                tile, epsg, expected
            ),
            TerrainError::UnsupportedCrs(epsg) => write!(f, "Unsupported CRS EPSG:{}", epsg),
        }
    }
}

impl std::error::Error for TerrainError {}

impl From<std::io::Error> for TerrainError {
    fn from(e: std::io::Error) -> Self {
        TerrainError::Io(e)
    }
}

impl From<tiff::TiffError> for TerrainError {
    fn from(e: tiff::TiffError) -> Self {
        TerrainError::Decode(e.to_string())
    }
}

/// Errors raised while loading or evaluating the trained classifier.
#[derive(Debug)]
pub enum ModelError {
    Io(std::io::Error),
    ParseError(String),
    /// The artifact contains no trees or no classes.
    EmptyModel,
    FeatureCount { expected: usize, found: usize },
    /// The artifact is structurally broken (bad child index, wrong leaf width).
    Malformed(String),
    /// A feature value the model cannot evaluate (NaN or infinite).
    NonFiniteFeature(usize),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Io(e) => write!(f, "I/O error: {}", e),
            ModelError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ModelError::EmptyModel => write!(f, "Model artifact has no trees or classes"),
            ModelError::FeatureCount { expected, found } => write!(
                f,
                "Model expects {} features, artifact declares {}",
                expected, found
            ),
            ModelError::Malformed(msg) => write!(f, "Malformed model: {}", msg),
            ModelError::NonFiniteFeature(index) => {
                write!(f, "Feature {} is not finite", index)
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(e: std::io::Error) -> Self {
        ModelError::Io(e)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::ParseError(e.to_string())
    }
}

/// Errors raised while reading the TOML configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    ParseError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::ParseError(e.to_string())
    }
}
