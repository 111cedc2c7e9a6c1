use crate::pointcloud::point::Point;

pub trait PointFilter {
    fn accepts(&self, point: &Point) -> bool;
}

/// Keeps returns at or above a minimum height above ground.
///
/// Points without a height above ground never pass.
#[derive(Debug, Clone, Copy)]
pub struct HagFilter {
    pub hag_min: f64,
}

impl PointFilter for HagFilter {
    fn accepts(&self, point: &Point) -> bool {
        point.hag.is_some_and(|hag| hag >= self.hag_min)
    }
}
