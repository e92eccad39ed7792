/// Terrain mosaic tests against real GeoTIFF files.
///
/// Each test writes small Float32 tiles into its own temporary directory,
/// loads the directory the way the service does at startup, and queries it
/// with WGS84 coordinates.

use basin_risk_service::model::{ElevationMiss, TerrainError};
use basin_risk_service::terrain::TerrainMosaic;
use basin_risk_service::terrain::reproject::Projection;
use basin_risk_service::terrain::tile::TerrainTile;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tiff::encoder::{TiffEncoder, colortype::Gray32Float};
use tiff::tags::Tag;

const UTM44N: u32 = 32644;
const OUTLET: (f64, f64) = (29.956, 78.18); // (lat, lon)

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

struct TileSpec<'a> {
    name: &'a str,
    /// Upper-left corner in projected metres.
    origin: (f64, f64),
    size: u32,
    cell_m: f64,
    epsg: Option<u16>,
    nodata: Option<&'a str>,
    fill: f32,
}

fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("basin_risk_{}_{}", test, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_tile(dir: &Path, spec: &TileSpec, cells: impl Fn(u32, u32) -> f32) {
    let file = File::create(dir.join(spec.name)).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<Gray32Float>(spec.size, spec.size).unwrap();

    let scale = [spec.cell_m, spec.cell_m, 0.0];
    image.encoder().write_tag(Tag::from_u16_exhaustive(33550), &scale[..]).unwrap();
    let tiepoint = [0.0, 0.0, 0.0, spec.origin.0, spec.origin.1, 0.0];
    image.encoder().write_tag(Tag::from_u16_exhaustive(33922), &tiepoint[..]).unwrap();

    if let Some(epsg) = spec.epsg {
        let geokeys: [u16; 12] = [
            1, 1, 0, 2, // version 1.1.0, 2 keys
            1024, 0, 1, 1, // model type: projected
            3072, 0, 1, epsg, // projected CRS
        ];
        image.encoder().write_tag(Tag::from_u16_exhaustive(34735), &geokeys[..]).unwrap();
    }
    if let Some(nodata) = spec.nodata {
        image.encoder().write_tag(Tag::from_u16_exhaustive(42113), nodata).unwrap();
    }

    let mut data = Vec::with_capacity((spec.size * spec.size) as usize);
    for row in 0..spec.size {
        for col in 0..spec.size {
            data.push(cells(row, col));
        }
    }
    image.write_data(&data).unwrap();
}

/// Projected position of the outlet.
fn outlet_xy() -> (f64, f64) {
    Projection::from_epsg(UTM44N).unwrap().forward(OUTLET.1, OUTLET.0)
}

/// A tile whose centre is the outlet.
fn outlet_spec<'a>(name: &'a str, fill: f32) -> TileSpec<'a> {
    let (x, y) = outlet_xy();
    TileSpec {
        name,
        origin: (x - 50.0, y + 50.0),
        size: 100,
        cell_m: 1.0,
        epsg: Some(UTM44N as u16),
        nodata: Some("-9999"),
        fill,
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[test]
fn test_decodes_georeference_crs_and_nodata() {
    let dir = scratch_dir("decode");
    let spec = outlet_spec("reach.tif", 301.25);
    write_tile(&dir, &spec, |_, _| spec.fill);

    let tile = TerrainTile::open(dir.join("reach.tif")).unwrap();
    assert_eq!(tile.name(), "reach.tif");
    assert_eq!(tile.epsg(), Some(UTM44N));
    assert_eq!(tile.dimensions(), (100, 100));

    let t = tile.transform();
    assert_eq!(t.origin_x, spec.origin.0);
    assert_eq!(t.origin_y, spec.origin.1);
    assert_eq!(t.pixel_width, 1.0);
    assert_eq!(t.pixel_height, -1.0);

    let (x, y) = outlet_xy();
    assert_eq!(tile.elevation_at(x, y), Some(301.25));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_tile_without_georeference_is_rejected() {
    let dir = scratch_dir("nogeo");
    let file = File::create(dir.join("plain.tif")).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    encoder.write_image::<Gray32Float>(4, 4, &[300.0; 16]).unwrap();

    let result = TerrainTile::open(dir.join("plain.tif"));
    assert!(matches!(result, Err(TerrainError::MissingGeoreference(_))));

    fs::remove_dir_all(dir).ok();
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

#[test]
fn test_load_dir_skips_bad_files_and_foreign_crs() {
    let dir = scratch_dir("load");

    let good = outlet_spec("b_reach.tif", 300.0);
    write_tile(&dir, &good, |_, _| good.fill);

    let mut foreign = outlet_spec("c_other_zone.tif", 250.0);
    foreign.epsg = Some(32643);
    write_tile(&dir, &foreign, |_, _| foreign.fill);

    fs::write(dir.join("a_corrupt.tif"), b"not a tiff at all").unwrap();
    fs::write(dir.join("notes.txt"), b"ignored").unwrap();

    let mosaic = TerrainMosaic::load_dir(&dir, UTM44N).unwrap();
    assert_eq!(mosaic.tile_count(), 1);

    let hit = mosaic.elevation_at(OUTLET.0, OUTLET.1).unwrap();
    assert_eq!(hit.tile_name, "b_reach.tif");
    assert_eq!(hit.meters, 300.0);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_directory_gives_empty_mosaic() {
    let dir = std::env::temp_dir().join(format!("basin_risk_absent_{}", std::process::id()));
    let mosaic = TerrainMosaic::load_dir(&dir, UTM44N).unwrap();
    assert!(mosaic.is_empty());
    assert_eq!(mosaic.elevation_at(OUTLET.0, OUTLET.1).unwrap_err(), ElevationMiss::NoTiles);
}

#[test]
fn test_unsupported_mosaic_crs_is_an_error() {
    let dir = scratch_dir("crs");
    assert!(matches!(
        TerrainMosaic::load_dir(&dir, 3857),
        Err(TerrainError::UnsupportedCrs(3857))
    ));
    fs::remove_dir_all(dir).ok();
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

#[test]
fn test_first_plausible_tile_in_name_order_answers() {
    let dir = scratch_dir("order");

    // The first tile is nodata over its west half; the second is complete.
    let holes = outlet_spec("01_holes.tif", 305.0);
    write_tile(&dir, &holes, |_, col| if col < 50 { -9999.0 } else { holes.fill });
    let full = outlet_spec("02_full.tif", 299.0);
    write_tile(&dir, &full, |_, _| full.fill);

    let mosaic = TerrainMosaic::load_dir(&dir, UTM44N).unwrap();
    assert_eq!(mosaic.tile_count(), 2);

    let projection = Projection::from_epsg(UTM44N).unwrap();
    let (x, y) = outlet_xy();

    let (lon, lat) = projection.inverse(x + 20.0, y);
    let east = mosaic.elevation_at(lat, lon).unwrap();
    assert_eq!(east.tile_name, "01_holes.tif");
    assert_eq!(east.meters, 305.0);

    let (lon, lat) = projection.inverse(x - 20.0, y);
    let west = mosaic.elevation_at(lat, lon).unwrap();
    assert_eq!(west.tile_name, "02_full.tif");
    assert_eq!(west.meters, 299.0);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_implausible_values_fall_through_to_outside() {
    let dir = scratch_dir("implausible");
    let spec = outlet_spec("spikes.tif", 12_000.0);
    write_tile(&dir, &spec, |row, _| if row < 50 { spec.fill } else { -500.0 });

    let mosaic = TerrainMosaic::load_dir(&dir, UTM44N).unwrap();
    assert_eq!(mosaic.tile_count(), 1);
    assert_eq!(
        mosaic.elevation_at(OUTLET.0, OUTLET.1).unwrap_err(),
        ElevationMiss::OutsideCoverage
    );
    assert_eq!(mosaic.elevation_at(31.0, 79.5).unwrap_err(), ElevationMiss::OutsideCoverage);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_coverage_ring_encloses_queried_point() {
    let dir = scratch_dir("coverage");
    let spec = outlet_spec("reach.tif", 300.0);
    write_tile(&dir, &spec, |_, _| spec.fill);

    let mosaic = TerrainMosaic::load_dir(&dir, UTM44N).unwrap();
    let coverage = mosaic.coverage();
    assert_eq!(coverage.len(), 1);

    let ring = &coverage[0].coords;
    assert_eq!(coverage[0].name, "reach.tif");
    assert_eq!(ring.len(), 5);
    assert_eq!(ring.first(), ring.last());

    let lons: Vec<f64> = ring.iter().map(|c| c[0]).collect();
    let lats: Vec<f64> = ring.iter().map(|c| c[1]).collect();
    let min = |v: &[f64]| v.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = |v: &[f64]| v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(min(&lons) < OUTLET.1 && OUTLET.1 < max(&lons));
    assert!(min(&lats) < OUTLET.0 && OUTLET.0 < max(&lats));
    // 100 m of ground is about 0.001 degrees
    assert!(max(&lats) - min(&lats) < 0.002);

    fs::remove_dir_all(dir).ok();
}
