//! Native GeoTIFF reading/writing (pure Rust, `tiff` crate)
//!
//! Supports single-band rasters georeferenced with ModelPixelScale +
//! ModelTiepoint or ModelTransformation, the EPSG code and raster type
//! (PixelIsArea or PixelIsPoint) from the GeoKeyDirectory and the
//! GDAL_NODATA tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Write the GDAL_NODATA tag when the raster declares a no-data value
    pub write_nodata: bool,
    /// Declare PixelIsPoint and anchor the tiepoint at the center of the
    /// first pixel instead of its outer corner
    pub pixel_is_point: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            write_nodata: true,
            pixel_is_point: false,
        }
    }
}

/// Read a single-band GeoTIFF file into a Raster
///
/// `band` is accepted for API symmetry; only band 1 exists in supported files.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file), band)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data), band)
}

/// Internal: decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    if let Some(b) = band.filter(|&b| b != 1) {
        return Err(Error::InvalidParameter {
            name: "band",
            value: b.to_string(),
            reason: "only single-band rasters are supported".into(),
        });
    }

    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    match decoder.colortype() {
        Ok(ColorType::Gray(_)) => {}
        Ok(other) => {
            return Err(Error::UnsupportedDataType(format!(
                "expected a single-band raster, found {:?}",
                other
            )))
        }
        Err(e) => return Err(Error::Other(format!("Cannot read color type: {}", e))),
    }

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;
    let keys = read_geo_keys(&mut decoder);
    let mut transform = read_geotransform(&mut decoder)?;
    if keys.pixel_is_point {
        // The model anchor is a pixel center; move it to the outer corner
        let (dx, dy) = half_pixel(&transform);
        transform.origin_x -= dx;
        transform.origin_y -= dy;
    }
    raster.set_transform(transform);
    raster.set_crs(keys.epsg.map(CRS::from_epsg));
    raster.set_nodata(read_nodata(&mut decoder).and_then(num_traits::cast));

    debug!(
        rows,
        cols,
        pixel_is_point = keys.pixel_is_point,
        crs = %raster.crs().map(|c| c.identifier()).unwrap_or_else(|| "none".into()),
        "decoded GeoTIFF"
    );

    Ok(raster)
}

fn cast_all<S, T>(buf: &[S]) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Read the GeoTransform from ModelPixelScale + ModelTiepoint, falling back
/// to ModelTransformation.
///
/// ScaleY is positive for north-up rasters; a negative ScaleY is kept as a
/// south-up transform rather than silently corrected.
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok();

    if let (Some(scale), Some(tiepoint)) = (&scale, &tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let pixel_width = scale[0];
            let pixel_height = -scale[1];
            let origin_x = tiepoint[3] - tiepoint[0] * pixel_width;
            let origin_y = tiepoint[4] - tiepoint[1] * pixel_height;
            return Ok(GeoTransform::new(origin_x, origin_y, pixel_width, pixel_height));
        }
    }

    if let Ok(t) = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION)) {
        if t.len() >= 16 {
            // Row-major 4x4 matrix, first two rows carry the affine terms
            return Ok(GeoTransform {
                origin_x: t[3],
                origin_y: t[7],
                pixel_width: t[0],
                pixel_height: t[5],
                row_rotation: t[1],
                col_rotation: t[4],
            });
        }
    }

    Err(Error::Configuration(
        "raster carries no georeferencing (ModelPixelScale/ModelTiepoint or ModelTransformation)"
            .into(),
    ))
}

/// GeoKeyDirectory entries the reader understands
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct GeoKeys {
    epsg: Option<u32>,
    pixel_is_point: bool,
}

/// Offset from the outer corner of pixel (0, 0) to its center
fn half_pixel(gt: &GeoTransform) -> (f64, f64) {
    (
        0.5 * (gt.pixel_width + gt.row_rotation),
        0.5 * (gt.col_rotation + gt.pixel_height),
    )
}

/// Read the EPSG code from GeographicTypeGeoKey or ProjectedCSTypeGeoKey
/// and the raster type from GTRasterTypeGeoKey
fn read_geo_keys<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> GeoKeys {
    let keys = match decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)) {
        Ok(keys) if keys.len() >= 4 => keys,
        _ => return GeoKeys::default(),
    };

    // Header: [version, revision, minor, count], then 4 shorts per key:
    // [key_id, tag_location, count, value_or_offset]
    let num_keys = keys[3] as usize;
    let mut geographic = None;
    let mut projected = None;
    let mut pixel_is_point = false;

    for entry in keys[4..].chunks_exact(4).take(num_keys) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        // Only inline SHORT values are read; 32767 means user-defined
        if location != 0 || value == 0 || value == 32767 {
            continue;
        }
        match key_id {
            PROJECTED_CS_TYPE_KEY => projected = Some(value as u32),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(value as u32),
            GT_RASTER_TYPE_KEY => pixel_is_point = value == RASTER_PIXEL_IS_POINT,
            _ => {}
        }
    }

    GeoKeys {
        epsg: projected.or(geographic),
        pixel_is_point,
    }
}

/// Read GDAL_NODATA, stored as an ASCII string
fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).ok()?;
    text.trim_end_matches('\0').trim().parse::<f64>().ok()
}

/// Write a Raster to a GeoTIFF file
///
/// Writes as 32-bit float together with georeferencing, CRS and no-data.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, BufWriter::new(file), options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

/// Internal: encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let (anchor_x, anchor_y) = if options.pixel_is_point {
        let (dx, dy) = half_pixel(gt);
        (gt.origin_x + dx, gt.origin_y + dy)
    } else {
        (gt.origin_x, gt.origin_y)
    };
    let tag_err = |e: tiff::TiffError| Error::Other(format!("Cannot write GeoTIFF tag: {}", e));

    if gt.row_rotation == 0.0 && gt.col_rotation == 0.0 {
        let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &scale[..])
            .map_err(tag_err)?;

        let tiepoint = [0.0, 0.0, 0.0, anchor_x, anchor_y, 0.0];
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &tiepoint[..])
            .map_err(tag_err)?;
    } else {
        let matrix = [
            gt.pixel_width, gt.row_rotation, 0.0, anchor_x,
            gt.col_rotation, gt.pixel_height, 0.0, anchor_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION), &matrix[..])
            .map_err(tag_err)?;
    }

    let geokeys = geo_key_directory(raster.crs(), options.pixel_is_point);
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), geokeys.as_slice())
        .map_err(tag_err)?;

    if options.write_nodata {
        if let Some(nodata) = raster.nodata().and_then(|v| v.to_f64()) {
            let text = nodata.to_string();
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), text.as_str())
                .map_err(tag_err)?;
        }
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

/// GeoKeyDirectory with model type, raster type and the EPSG code when known
fn geo_key_directory(crs: Option<&CRS>, pixel_is_point: bool) -> Vec<u16> {
    let geographic = crs.map(|c| c.is_geographic()).unwrap_or(false);
    // GTModelType: 1 = projected, 2 = geographic
    let model_type = if geographic { 2 } else { 1 };
    let raster_type = if pixel_is_point {
        RASTER_PIXEL_IS_POINT
    } else {
        RASTER_PIXEL_IS_AREA
    };

    let mut keys: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE_KEY, 0, 1, model_type],
        [GT_RASTER_TYPE_KEY, 0, 1, raster_type],
    ];

    if let Some(code) = crs.and_then(|c| c.epsg()).and_then(|c| u16::try_from(c).ok()) {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        keys.push([key, 0, 1, code]);
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}
