/// Catchment point registry for the basin.
///
/// Loads the catchment point dataset (`id,lat,lon,elevation,rain_weight,cn`)
/// once at startup and precomputes the SCS retention constants for every
/// point. The registry is read-only afterwards; request handlers only ever
/// read it in bulk.

use crate::hydrology::runoff::scs_constants;
use crate::logging::{self, DataSource};
use crate::model::{CatchmentPoint, RegistryError};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One row of the catchment point CSV.
#[derive(Debug, Deserialize)]
struct CatchmentRow {
    id: i64,
    lat: f64,
    lon: f64,
    elevation: f64,
    rain_weight: f64,
    cn: f64,
}

/// Fixed in-memory table of basin sample points.
#[derive(Debug, Clone, Default)]
pub struct CatchmentRegistry {
    points: Vec<CatchmentPoint>,
}

impl CatchmentRegistry {
    /// Build a registry from already-validated points.
    pub fn from_points(points: Vec<CatchmentPoint>) -> Self {
        CatchmentRegistry { points }
    }

    pub fn empty() -> Self {
        CatchmentRegistry::default()
    }

    pub fn points(&self) -> &[CatchmentPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Load from a CSV file. Rows that fail validation are skipped and counted.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Self, usize), RegistryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load from any CSV source with a header row. Rows that do not parse or
    /// fail validation are skipped and counted; only I/O on the source or an
    /// unreadable header is an error.
    pub fn from_reader<R: Read>(reader: R) -> Result<(Self, usize), RegistryError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        csv_reader.headers()?;

        let mut points = Vec::new();
        let mut skipped = 0;

        for (line, record) in csv_reader.deserialize::<CatchmentRow>().enumerate() {
            let row = match record {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    skipped += 1;
                    logging::debug(DataSource::Registry, None, &format!("row {}: {}", line + 1, e));
                    continue;
                }
            };
            match catchment_point(row) {
                Ok(point) => points.push(point),
                Err(reason) => {
                    skipped += 1;
                    logging::debug(DataSource::Registry, None, &reason);
                }
            }
        }

        Ok((CatchmentRegistry { points }, skipped))
    }

    /// Load at startup, degrading to an empty registry when the file is
    /// missing or unreadable. The outcome is logged once.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        let display = path.as_ref().display().to_string();
        match Self::load(&path) {
            Ok((registry, skipped)) => {
                logging::log_load_summary(DataSource::Registry, "catchment points", registry.len(), skipped);
                registry
            }
            Err(e) => {
                logging::warn(
                    DataSource::Registry,
                    Some(&display),
                    &format!("Catchment points unavailable ({}); distributed runoff disabled", e),
                );
                CatchmentRegistry::empty()
            }
        }
    }
}

/// Validate a CSV row and derive its retention constants.
fn catchment_point(row: CatchmentRow) -> Result<CatchmentPoint, String> {
    if !(row.cn > 0.0 && row.cn <= 100.0) {
        return Err(format!("point {}: curve number {} outside (0, 100]", row.id, row.cn));
    }
    if !(row.rain_weight >= 0.0) || !row.rain_weight.is_finite() {
        return Err(format!("point {}: invalid rain weight {}", row.id, row.rain_weight));
    }
    if !row.lat.is_finite() || !row.lon.is_finite() || !row.elevation.is_finite() {
        return Err(format!("point {}: non-finite position or elevation", row.id));
    }

    let (retention_mm, initial_abstraction_mm) = scs_constants(row.cn);

    Ok(CatchmentPoint {
        id: row.id,
        lat: row.lat,
        lon: row.lon,
        elevation_m: row.elevation,
        curve_number: row.cn,
        rain_weight: row.rain_weight,
        retention_mm,
        initial_abstraction_mm,
    })
}
