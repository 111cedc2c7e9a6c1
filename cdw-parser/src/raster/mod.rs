pub mod geotiff;

pub use geotiff::{load_label_raster, GeoTransform};
