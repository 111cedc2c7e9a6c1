//! Core types and the per-cluster metric pipeline for coarse woody debris
//! (CDW) candidates extracted from a labeled canopy height raster.

pub mod error;
pub mod metrics;
pub mod pointcloud;
pub mod raster;

pub use error::CoreError;
