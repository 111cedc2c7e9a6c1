//! Readers for the inputs of the cluster metrics pipeline: point clouds
//! (CSV/TXT, LAS/LAZ) and GeoTIFF label rasters.

pub mod error;
pub mod parsers;
pub mod raster;

pub use error::ParseError;
