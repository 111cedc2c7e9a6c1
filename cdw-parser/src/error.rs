use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("file extension is not found: {}", .0.display())]
    MissingExtension(PathBuf),
    #[error("multiple extensions are not supported: {0:?}")]
    MixedExtensions(Vec<String>),
    #[error("no input files")]
    NoInput,
    #[error("required column '{0}' is missing")]
    MissingField(&'static str),
    #[error("failed to parse '{field}' from '{value}' (line {line})")]
    InvalidNumber {
        field: &'static str,
        value: String,
        line: u64,
    },
    #[error("invalid raster: {0}")]
    InvalidRaster(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Las(#[from] las::Error),
    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] cdw_core::CoreError),
}
