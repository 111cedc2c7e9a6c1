use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use cdw_core::raster::label::{LabelRaster, BACKGROUND};

use crate::error::ParseError;

/// GDAL's nodata tag, stored as an ASCII number.
const GDAL_NODATA: Tag = Tag::Unknown(42113);

/// Relative tolerance when comparing the x and y pixel sizes.
const SQUARE_TOLERANCE: f64 = 1e-6;

/// Pixel size and top-left corner read from the GeoTIFF model tags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub res_x: f64,
    pub res_y: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl GeoTransform {
    /// Falls back to a 1 m grid anchored at (0, 0) for the tags that are absent.
    pub fn from_decoder<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Self, ParseError> {
        let mut transform = GeoTransform {
            res_x: 1.0,
            res_y: 1.0,
            origin_x: 0.0,
            origin_y: 0.0,
        };

        match decoder.find_tag(Tag::ModelPixelScaleTag)? {
            Some(value) => {
                let scale = value.into_f64_vec()?;
                if scale.len() < 2 {
                    return Err(ParseError::InvalidRaster(format!(
                        "ModelPixelScale needs 2 values, got {}",
                        scale.len()
                    )));
                }
                transform.res_x = scale[0];
                transform.res_y = scale[1];
            }
            None => log::warn!("GeoTIFF has no ModelPixelScale tag, assuming 1.0 m pixels"),
        }

        match decoder.find_tag(Tag::ModelTiepointTag)? {
            Some(value) => {
                let tie = value.into_f64_vec()?;
                if tie.len() < 6 {
                    return Err(ParseError::InvalidRaster(format!(
                        "ModelTiepoint needs 6 values, got {}",
                        tie.len()
                    )));
                }
                // tie point (i, j) -> (x, y); shift it back to pixel (0, 0)
                transform.origin_x = tie[3] - tie[0] * transform.res_x;
                transform.origin_y = tie[4] + tie[1] * transform.res_y;
            }
            None => log::warn!("GeoTIFF has no ModelTiepoint tag, assuming origin (0, 0)"),
        }

        Ok(transform)
    }

    /// Square pixel size, or an error for anisotropic grids.
    pub fn square_resolution(&self) -> Result<f64, ParseError> {
        let (rx, ry) = (self.res_x.abs(), self.res_y.abs());
        if !rx.is_finite() || rx <= 0.0 {
            return Err(ParseError::InvalidRaster(format!(
                "pixel size must be positive, got {}",
                self.res_x
            )));
        }
        if (rx - ry).abs() > SQUARE_TOLERANCE * rx {
            return Err(ParseError::InvalidRaster(format!(
                "pixels must be square, got {rx} x {ry}"
            )));
        }
        Ok(rx)
    }
}

/// Loads a single-band label raster.
///
/// Negative values, NaN and the GDAL nodata value become background. Any
/// other non-integral value is rejected, since it cannot be a cluster id.
pub fn load_label_raster(path: &Path) -> Result<LabelRaster, ParseError> {
    let start = std::time::Instant::now();
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;

    let (width, height) = decoder.dimensions()?;
    let (ncol, nrow) = (width as usize, height as usize);

    let transform = GeoTransform::from_decoder(&mut decoder)?;
    let res = transform.square_resolution()?;
    let nodata = read_nodata(&mut decoder)?;

    let values: Vec<f64> = match decoder.read_image()? {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    };

    if values.len() != nrow * ncol {
        return Err(ParseError::InvalidRaster(format!(
            "expected a single band of {}x{} pixels, got {} samples",
            nrow,
            ncol,
            values.len()
        )));
    }

    let labels = values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| to_label(value, nodata, idx, ncol))
        .collect::<Result<Vec<u32>, ParseError>>()?;

    let raster = LabelRaster::from_vec(nrow, ncol, labels, res)?
        .with_origin(transform.origin_x, transform.origin_y);

    log::info!(
        "loaded label raster {:?}: {}x{} at {} m in {:?}",
        path,
        nrow,
        ncol,
        res,
        start.elapsed()
    );
    Ok(raster)
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, ParseError> {
    let Some(value) = decoder.find_tag(GDAL_NODATA)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match text.parse::<f64>() {
        Ok(nodata) => Ok(Some(nodata)),
        Err(_) => {
            log::warn!("ignoring unparsable GDAL nodata value '{text}'");
            Ok(None)
        }
    }
}

fn to_label(value: f64, nodata: Option<f64>, idx: usize, ncol: usize) -> Result<u32, ParseError> {
    if value.is_nan() || value < 0.0 || nodata == Some(value) {
        return Ok(BACKGROUND);
    }
    if value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(ParseError::InvalidRaster(format!(
            "pixel ({}, {}) holds {value}, which is not a cluster id",
            idx / ncol,
            idx % ncol
        )));
    }
    Ok(value as u32)
}
