//! A single georeferenced elevation tile.
//!
//! Tiles are single-band GeoTIFFs. The affine transform comes from
//! ModelPixelScale + ModelTiepoint (or ModelTransformation when present),
//! the EPSG code from the GeoKeyDirectory, and the nodata value from the
//! GDAL_NODATA ASCII tag.

use crate::model::TerrainError;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

// GeoTIFF tag numbers; look them up through `geotiff_tag`
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

// GeoKey ids
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Elevations outside this open interval are treated as sensor garbage.
pub const MIN_PLAUSIBLE_M: f64 = -100.0;
pub const MAX_PLAUSIBLE_M: f64 = 9000.0;

/// Affine pixel ↔ coordinate transform (GDAL ordering).
///
/// ```text
/// x = origin_x + col * pixel_width  + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    /// Negative for north-up rasters.
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform with no rotation.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        GeoTransform {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    /// Coordinate of a (fractional) pixel position.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Fractional (col, row) of a coordinate; `None` for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (dx * self.pixel_height - dy * self.row_rotation) / det;
        let row = (dy * self.pixel_width - dx * self.col_rotation) / det;
        Some((col, row))
    }
}

/// Axis-aligned bounds in the tile's projected CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[derive(Debug, Clone)]
pub struct TerrainTile {
    name: String,
    width: usize,
    height: usize,
    data: Vec<f32>,
    transform: GeoTransform,
    epsg: Option<u32>,
    nodata: Option<f64>,
}

impl TerrainTile {
    /// Build a tile from an in-memory grid (row-major, `width * height` cells).
    pub fn from_parts(
        name: impl Into<String>,
        width: usize,
        height: usize,
        data: Vec<f32>,
        transform: GeoTransform,
        epsg: Option<u32>,
        nodata: Option<f64>,
    ) -> Result<Self, TerrainError> {
        let name = name.into();
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(TerrainError::Decode(format!(
                "{}: grid of {} cells does not match {}x{}",
                name,
                data.len(),
                width,
                height
            )));
        }
        Ok(TerrainTile {
            name,
            width,
            height,
            data,
            transform,
            epsg,
            nodata,
        })
    }

    /// Read a GeoTIFF tile from disk; the tile name is the file name.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TerrainError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path)?;
        Self::decode(name, BufReader::new(file))
    }

    /// Decode a GeoTIFF from any seekable reader.
    pub fn decode<R: Read + Seek>(name: String, reader: R) -> Result<Self, TerrainError> {
        let mut decoder = Decoder::new(reader)?;
        let (width, height) = decoder.dimensions()?;

        let transform = read_transform(&mut decoder)?
            .ok_or_else(|| TerrainError::MissingGeoreference(name.clone()))?;
        let epsg = read_epsg(&mut decoder)?;
        let nodata = read_nodata(&mut decoder)?;

        let data: Vec<f32> = match decoder.read_image()? {
            DecodingResult::F32(buf) => buf,
            DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
            DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
            DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
            DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
            DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
            DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
            DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
            _ => {
                return Err(TerrainError::Decode(format!(
                    "{}: unsupported pixel format",
                    name
                )));
            }
        };

        Self::from_parts(name, width as usize, height as usize, data, transform, epsg, nodata)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Corner coordinates in pixel-area order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let w = self.width as f64;
        let h = self.height as f64;
        [
            self.transform.pixel_to_geo(0.0, 0.0),
            self.transform.pixel_to_geo(w, 0.0),
            self.transform.pixel_to_geo(w, h),
            self.transform.pixel_to_geo(0.0, h),
        ]
    }

    pub fn bounds(&self) -> Bounds {
        let corners = self.corners();
        let mut b = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (x, y) in corners {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        b
    }

    /// Raw cell value at a projected coordinate, if it lies on the grid.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<f64> {
        let (col, row) = self.transform.geo_to_pixel(x, y)?;
        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        if col < 0.0 || row < 0.0 || col > self.width as f64 || row > self.height as f64 {
            return None;
        }
        // A point on the far edge belongs to the last cell.
        let col = (col.floor() as usize).min(self.width - 1);
        let row = (row.floor() as usize).min(self.height - 1);
        self.data.get(row * self.width + col).map(|&v| v as f64)
    }

    /// Plausible elevation at a projected coordinate.
    ///
    /// `None` when the point is off the grid, the cell is nodata or NaN,
    /// or the value falls outside (-100, 9000) m.
    pub fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        if !self.bounds().contains(x, y) {
            return None;
        }
        let value = self.cell_at(x, y)?;
        if value.is_nan() || self.nodata.is_some_and(|nd| value == nd) {
            return None;
        }
        (value > MIN_PLAUSIBLE_M && value < MAX_PLAUSIBLE_M).then_some(value)
    }
}

// ---------------------------------------------------------------------------
// GeoTIFF tag readers
// ---------------------------------------------------------------------------

/// The decoder keys its IFD map by the named `Tag` variant when the crate
/// knows the number, so a raw `Tag::Unknown(code)` would never match.
fn geotiff_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>, TerrainError> {
    if let Some(value) = decoder.find_tag(geotiff_tag(MODEL_TRANSFORMATION))? {
        let m = value.into_f64_vec()?;
        if m.len() >= 8 {
            return Ok(Some(GeoTransform {
                origin_x: m[3],
                pixel_width: m[0],
                row_rotation: m[1],
                origin_y: m[7],
                col_rotation: m[4],
                pixel_height: m[5],
            }));
        }
    }

    let scale = decoder.find_tag(geotiff_tag(MODEL_PIXEL_SCALE))?;
    let tiepoint = decoder.find_tag(geotiff_tag(MODEL_TIEPOINT))?;
    let (Some(scale), Some(tiepoint)) = (scale, tiepoint) else {
        return Ok(None);
    };
    let scale = scale.into_f64_vec()?;
    let tiepoint = tiepoint.into_f64_vec()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Ok(None);
    }

    // tiepoint: [I, J, K, X, Y, Z]; raster point (I, J) sits at model point (X, Y)
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(Some(GeoTransform::north_up(origin_x, origin_y, scale[0], -scale[1])))
}

fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<u32>, TerrainError> {
    let Some(value) = decoder.find_tag(geotiff_tag(GEO_KEY_DIRECTORY))? else {
        return Ok(None);
    };
    Ok(epsg_from_geokeys(&value.into_u16_vec()?))
}

/// EPSG code from a GeoKeyDirectory; projected CRS wins over geographic.
pub fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // Only inline SHORT values carry a code directly.
        if location != 0 || value == 0 || value == 32767 {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_KEY => return Some(value as u32),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(value as u32),
            _ => {}
        }
    }
    geographic
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, TerrainError> {
    let Some(value) = decoder.find_tag(geotiff_tag(GDAL_NODATA))? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    Ok(text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse::<f64>().ok())
}
