use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointAttributes {
    pub intensity: Option<f64>,
    pub classification: Option<u8>,
}

/// A single LiDAR return.
///
/// `hag` (height above ground) is absent for sources that only carry
/// elevation, such as raw LAS/LAZ tiles, until the cloud is normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub hag: Option<f64>,
    pub attributes: PointAttributes,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            hag: None,
            attributes: PointAttributes::default(),
        }
    }

    pub fn with_hag(mut self, hag: f64) -> Self {
        self.hag = Some(hag);
        self
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.attributes.intensity = Some(intensity);
        self
    }

    pub fn with_classification(mut self, classification: u8) -> Self {
        self.attributes.classification = Some(classification);
        self
    }

    pub fn intensity(&self) -> Option<f64> {
        self.attributes.intensity
    }
}

#[derive(Debug, Clone)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub metadata: Metadata,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        let metadata = Metadata::from_points(&points);
        PointCloud { points, metadata }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Recomputes the metadata after the points were modified in place.
    pub fn refresh_metadata(&mut self) {
        self.metadata = Metadata::from_points(&self.points);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self {
            min: [f64::MAX, f64::MAX, f64::MAX],
            max: [f64::MIN, f64::MIN, f64::MIN],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub point_count: usize,
    pub bounding_volume: BoundingVolume,
    /// Every point carries a height above ground.
    pub has_hag: bool,
    /// At least one point carries an intensity value.
    pub has_intensity: bool,
}

impl Metadata {
    fn from_points(points: &[Point]) -> Self {
        let mut bounding_volume = BoundingVolume::default();
        let mut has_hag = true;
        let mut has_intensity = false;

        for point in points {
            bounding_volume.max[0] = bounding_volume.max[0].max(point.x);
            bounding_volume.max[1] = bounding_volume.max[1].max(point.y);
            bounding_volume.max[2] = bounding_volume.max[2].max(point.z);
            bounding_volume.min[0] = bounding_volume.min[0].min(point.x);
            bounding_volume.min[1] = bounding_volume.min[1].min(point.y);
            bounding_volume.min[2] = bounding_volume.min[2].min(point.z);

            has_hag &= point.hag.is_some();
            has_intensity |= point.attributes.intensity.is_some();
        }

        Metadata {
            point_count: points.len(),
            bounding_volume,
            has_hag,
            has_intensity,
        }
    }
}
