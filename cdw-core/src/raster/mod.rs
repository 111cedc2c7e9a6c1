pub mod label;

pub use label::{LabelRaster, BACKGROUND};
