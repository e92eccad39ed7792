/// Terrain mosaic: point elevation lookups over a set of LiDAR tiles.
///
/// All tiles share one projected CRS. A query is projected into that CRS
/// once, then tiles are scanned in load order and the first tile holding a
/// plausible value at the point answers. Tiles may overlap or leave gaps.

pub mod reproject;
pub mod tile;

use crate::logging::{self, DataSource};
use crate::model::{Elevation, ElevationMiss, TerrainError};
use reproject::Projection;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tile::TerrainTile;

/// Footprint of one tile as a closed `[lon, lat]` ring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileFootprint {
    pub name: String,
    pub coords: Vec<[f64; 2]>,
}

#[derive(Debug, Clone)]
pub struct TerrainMosaic {
    epsg: u32,
    projection: Projection,
    tiles: Vec<TerrainTile>,
}

impl TerrainMosaic {
    /// Mosaic over already-loaded tiles, all in `epsg`.
    pub fn from_tiles(epsg: u32, tiles: Vec<TerrainTile>) -> Result<Self, TerrainError> {
        let projection = Projection::from_epsg(epsg)?;
        Ok(TerrainMosaic {
            epsg,
            projection,
            tiles,
        })
    }

    /// Mosaic with no tiles; every lookup reports `NoTiles`.
    pub fn empty(epsg: u32) -> Result<Self, TerrainError> {
        Self::from_tiles(epsg, Vec::new())
    }

    /// Mosaic that cannot hold tiles; used when the configured CRS is unusable.
    pub fn disabled() -> Self {
        TerrainMosaic {
            epsg: reproject::WGS84_EPSG,
            projection: Projection::Geographic,
            tiles: Vec::new(),
        }
    }

    /// Load every `.tif`/`.tiff` file in `dir`, sorted by file name.
    ///
    /// Unreadable tiles and tiles in another CRS are skipped and logged.
    /// A missing directory yields an empty mosaic.
    pub fn load_dir<P: AsRef<Path>>(dir: P, epsg: u32) -> Result<Self, TerrainError> {
        let dir = dir.as_ref();
        let mut mosaic = Self::empty(epsg)?;

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                logging::warn(
                    DataSource::Terrain,
                    Some(&dir.display().to_string()),
                    &format!("Tile directory unavailable ({}); elevation lookups disabled", e),
                );
                return Ok(mosaic);
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_tiff(path))
            .collect();
        paths.sort();

        let mut skipped = 0;
        for path in &paths {
            match mosaic.load_tile(path) {
                Ok(()) => {}
                Err(e) => {
                    skipped += 1;
                    logging::warn(
                        DataSource::Terrain,
                        Some(&path.display().to_string()),
                        &format!("Skipping tile: {}", e),
                    );
                }
            }
        }

        logging::log_load_summary(DataSource::Terrain, "elevation tiles", mosaic.tile_count(), skipped);
        Ok(mosaic)
    }

    fn load_tile(&mut self, path: &Path) -> Result<(), TerrainError> {
        let tile = TerrainTile::open(path)?;
        self.push(tile)
    }

    /// Append a tile after checking its CRS; tiles with no CRS are taken as-is.
    pub fn push(&mut self, tile: TerrainTile) -> Result<(), TerrainError> {
        if let Some(epsg) = tile.epsg() {
            if epsg != self.epsg {
                return Err(TerrainError::CrsMismatch {
                    tile: tile.name().to_string(),
                    epsg,
                    expected: self.epsg,
                });
            }
        }
        self.tiles.push(tile);
        Ok(())
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Elevation at a WGS84 point, or why there is none.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> Result<Elevation, ElevationMiss> {
        if self.tiles.is_empty() {
            return Err(ElevationMiss::NoTiles);
        }

        let (x, y) = self.projection.forward(lon, lat);
        self.tiles
            .iter()
            .find_map(|tile| {
                tile.elevation_at(x, y).map(|meters| Elevation {
                    meters,
                    tile_name: tile.name().to_string(),
                })
            })
            .ok_or(ElevationMiss::OutsideCoverage)
    }

    /// Footprint of every tile, in load order.
    pub fn coverage(&self) -> Vec<TileFootprint> {
        self.tiles
            .iter()
            .map(|tile| {
                let mut coords: Vec<[f64; 2]> = tile
                    .corners()
                    .iter()
                    .map(|&(x, y)| {
                        let (lon, lat) = self.projection.inverse(x, y);
                        [lon, lat]
                    })
                    .collect();
                if let Some(&first) = coords.first() {
                    coords.push(first);
                }
                TileFootprint {
                    name: tile.name().to_string(),
                    coords,
                }
            })
            .collect()
    }
}

fn is_tiff(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile::GeoTransform;

    const UTM44N: u32 = 32644;

    /// A 100 x 100 tile of 1 m cells centred on the projected query point.
    fn tile_around(name: &str, lat: f64, lon: f64, value: f32, epsg: Option<u32>) -> TerrainTile {
        let projection = Projection::from_epsg(UTM44N).unwrap();
        let (x, y) = projection.forward(lon, lat);
        TerrainTile::from_parts(
            name,
            100,
            100,
            vec![value; 100 * 100],
            GeoTransform::north_up(x - 50.0, y + 50.0, 1.0, -1.0),
            epsg,
            Some(-9999.0),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_mosaic_reports_no_tiles() {
        let mosaic = TerrainMosaic::empty(UTM44N).unwrap();
        assert_eq!(mosaic.elevation_at(29.956, 78.18), Err(ElevationMiss::NoTiles));
        assert!(mosaic.coverage().is_empty());
    }

    #[test]
    fn test_point_outside_every_tile_reports_outside() {
        let tile = tile_around("a.tif", 29.956, 78.18, 301.0, Some(UTM44N));
        let mosaic = TerrainMosaic::from_tiles(UTM44N, vec![tile]).unwrap();
        assert_eq!(mosaic.elevation_at(30.5, 78.9), Err(ElevationMiss::OutsideCoverage));
    }

    #[test]
    fn test_lookup_returns_value_and_tile_name() {
        let tile = tile_around("a.tif", 29.956, 78.18, 301.25, Some(UTM44N));
        let mosaic = TerrainMosaic::from_tiles(UTM44N, vec![tile]).unwrap();
        let found = mosaic.elevation_at(29.956, 78.18).unwrap();
        assert_eq!(found.meters, 301.25);
        assert_eq!(found.tile_name, "a.tif");
    }

    #[test]
    fn test_first_tile_wins_on_overlap() {
        let first = tile_around("first.tif", 29.956, 78.18, 300.0, Some(UTM44N));
        let second = tile_around("second.tif", 29.956, 78.18, 310.0, Some(UTM44N));
        let mosaic = TerrainMosaic::from_tiles(UTM44N, vec![first, second]).unwrap();
        assert_eq!(mosaic.elevation_at(29.956, 78.18).unwrap().tile_name, "first.tif");
    }

    #[test]
    fn test_nodata_in_first_tile_falls_through_to_next() {
        let hole = tile_around("hole.tif", 29.956, 78.18, -9999.0, Some(UTM44N));
        let fill = tile_around("fill.tif", 29.956, 78.18, 305.0, Some(UTM44N));
        let mosaic = TerrainMosaic::from_tiles(UTM44N, vec![hole, fill]).unwrap();
        let found = mosaic.elevation_at(29.956, 78.18).unwrap();
        assert_eq!(found.tile_name, "fill.tif");
        assert_eq!(found.meters, 305.0);
    }

    #[test]
    fn test_all_implausible_values_report_outside() {
        let spike = tile_around("spike.tif", 29.956, 78.18, 12_000.0, Some(UTM44N));
        let mosaic = TerrainMosaic::from_tiles(UTM44N, vec![spike]).unwrap();
        assert_eq!(mosaic.elevation_at(29.956, 78.18), Err(ElevationMiss::OutsideCoverage));
    }

    #[test]
    fn test_tile_in_other_crs_is_rejected() {
        let mut mosaic = TerrainMosaic::empty(UTM44N).unwrap();
        let foreign = tile_around("foreign.tif", 29.956, 78.18, 300.0, Some(32643));
        assert!(matches!(mosaic.push(foreign), Err(TerrainError::CrsMismatch { epsg: 32643, .. })));
        let untagged = tile_around("untagged.tif", 29.956, 78.18, 300.0, None);
        assert!(mosaic.push(untagged).is_ok());
        assert_eq!(mosaic.tile_count(), 1);
    }

    #[test]
    fn test_coverage_ring_is_closed_and_surrounds_tile_centre() {
        let tile = tile_around("a.tif", 29.956, 78.18, 300.0, Some(UTM44N));
        let mosaic = TerrainMosaic::from_tiles(UTM44N, vec![tile]).unwrap();
        let coverage = mosaic.coverage();
        assert_eq!(coverage.len(), 1);
        let ring = &coverage[0].coords;
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        let (min_lon, max_lon) = ring.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c[0]), hi.max(c[0])));
        let (min_lat, max_lat) = ring.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c[1]), hi.max(c[1])));
        assert!(min_lon < 78.18 && 78.18 < max_lon);
        assert!(min_lat < 29.956 && 29.956 < max_lat);
    }

    #[test]
    fn test_missing_directory_yields_empty_mosaic() {
        let mosaic = TerrainMosaic::load_dir("/nonexistent/tiles/dir", UTM44N).unwrap();
        assert!(mosaic.is_empty());
    }
}
