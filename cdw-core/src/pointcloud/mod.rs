pub mod filter;
pub mod normalize;
pub mod point;

pub use point::{Point, PointAttributes, PointCloud};
