/// River flood risk engine for a single monsoon-fed basin.
///
/// Module map:
/// - `model`      - shared domain types and boundary error enums
/// - `config`     - basin.toml loading with calibrated defaults
/// - `logging`    - structured console/file logger
/// - `registry`   - catchment point dataset (CSV)
/// - `terrain`    - GeoTIFF elevation mosaic and UTM reprojection
/// - `hydrology`  - SCS runoff, basin discharge, flood stage
/// - `ingest`     - upstream weather source (Open-Meteo)
/// - `alert`      - threshold rule, trained classifier, advisories
/// - `simulation` - what-if overrides
/// - `forecast`   - 12-hour outlook
/// - `engine`     - request-level queries over the loaded datasets
/// - `verify`     - readiness report

pub mod alert;
pub mod config;
pub mod engine;
pub mod forecast;
pub mod hydrology;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod registry;
pub mod simulation;
pub mod terrain;
pub mod verify;
