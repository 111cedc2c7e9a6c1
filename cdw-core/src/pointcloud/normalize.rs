use std::num::NonZeroUsize;

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use rayon::iter::{IntoParallelRefMutIterator as _, ParallelIterator as _};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pointcloud::point::PointCloud;

/// ASPRS class code for ground returns.
pub const GROUND_CLASS: u8 = 2;

const MIN_GROUND_POINTS: usize = 3;
const DISTANCE_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub ground_class: u8,
    /// Number of nearest ground returns blended per point.
    pub neighbors: usize,
    /// Upper clip for the computed height above ground.
    pub hag_clip_max: Option<f64>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            ground_class: GROUND_CLASS,
            neighbors: 3,
            hag_clip_max: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationSummary {
    pub ground_points: usize,
    /// Points that had no height above ground and received one.
    pub filled: usize,
    pub used_all_points_as_ground: bool,
}

/// Derives per-point height above ground from ground-classified returns by
/// inverse-distance weighting of the nearest ground elevations.
///
/// Only points without a height above ground are filled; supplied values are
/// kept as they are.
pub struct GroundNormalizer {
    config: NormalizationConfig,
    neighbors: NonZeroUsize,
}

impl GroundNormalizer {
    pub fn new(config: NormalizationConfig) -> Result<Self, CoreError> {
        let Some(neighbors) = NonZeroUsize::new(config.neighbors) else {
            return Err(CoreError::InvalidConfig(
                "normalization needs at least one neighbor".to_string(),
            ));
        };
        if let Some(clip) = config.hag_clip_max {
            if clip.is_nan() || clip <= 0.0 {
                return Err(CoreError::InvalidConfig(format!(
                    "hag_clip_max must be positive, got {clip}"
                )));
            }
        }
        Ok(Self { config, neighbors })
    }

    pub fn normalize(&self, cloud: &mut PointCloud) -> Result<NormalizationSummary, CoreError> {
        let classified = cloud
            .points
            .iter()
            .any(|p| p.attributes.classification.is_some());

        let ground: Vec<([f64; 2], f64)> = cloud
            .points
            .iter()
            .filter(|p| {
                !classified || p.attributes.classification == Some(self.config.ground_class)
            })
            .map(|p| ([p.x, p.y], p.z))
            .collect();

        if !classified {
            log::warn!("no classification found, using all points as ground");
        }
        if ground.len() < MIN_GROUND_POINTS {
            return Err(CoreError::InsufficientGround {
                found: ground.len(),
            });
        }
        let filled = cloud.points.iter().filter(|p| p.hag.is_none()).count();
        log::info!(
            "ground points: {}, filling height above ground for {} of {} points",
            ground.len(),
            filled,
            cloud.points.len()
        );

        let coords: Vec<[f64; 2]> = ground.iter().map(|(xy, _)| *xy).collect();
        // built once over a static set; copes with many returns sharing an axis value
        let tree: ImmutableKdTree<f64, 2> = ImmutableKdTree::new_from_slice(&coords);
        let neighbors = self.neighbors;
        let clip = self.config.hag_clip_max;

        cloud.points.par_iter_mut().for_each(|point| {
            if point.hag.is_some() {
                return;
            }
            let results = tree.nearest_n::<SquaredEuclidean>(&[point.x, point.y], neighbors.into());

            let mut weighted = 0.0;
            let mut weight_sum = 0.0;
            for nn in results {
                let weight = 1.0 / (nn.distance.sqrt() + DISTANCE_EPSILON);
                weighted += weight * ground[nn.item as usize].1;
                weight_sum += weight;
            }

            let ground_z = weighted / weight_sum;
            let mut hag = (point.z - ground_z).max(0.0);
            if let Some(max) = clip {
                hag = hag.min(max);
            }
            point.hag = Some(hag);
        });
        cloud.refresh_metadata();

        Ok(NormalizationSummary {
            ground_points: ground.len(),
            filled,
            used_all_points_as_ground: !classified,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::pointcloud::point::Point;

    fn flat_ground(z: f64) -> Vec<Point> {
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                points.push(
                    Point::new(i as f64, j as f64, z).with_classification(GROUND_CLASS),
                );
            }
        }
        points
    }

    #[test]
    fn flat_ground_recovers_height() {
        let mut points = flat_ground(100.0);
        points.push(Point::new(2.3, 1.7, 100.8).with_classification(1));
        let mut cloud = PointCloud::new(points);

        let normalizer = GroundNormalizer::new(NormalizationConfig::default()).unwrap();
        let summary = normalizer.normalize(&mut cloud).unwrap();

        assert_eq!(summary.ground_points, 25);
        assert_eq!(summary.filled, 26);
        assert!(!summary.used_all_points_as_ground);
        assert!(cloud.metadata.has_hag);
        let log = cloud.points.last().unwrap();
        assert_abs_diff_eq!(log.hag.unwrap(), 0.8, epsilon = 1e-9);
        assert_abs_diff_eq!(cloud.points[0].hag.unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn below_ground_is_zero_and_clip_applies() {
        let mut points = flat_ground(10.0);
        points.push(Point::new(1.5, 1.5, 9.0).with_classification(1));
        points.push(Point::new(2.5, 2.5, 14.0).with_classification(1));
        let mut cloud = PointCloud::new(points);

        let normalizer = GroundNormalizer::new(NormalizationConfig {
            hag_clip_max: Some(1.5),
            ..Default::default()
        })
        .unwrap();
        normalizer.normalize(&mut cloud).unwrap();

        let n = cloud.points.len();
        assert_eq!(cloud.points[n - 2].hag, Some(0.0));
        assert_abs_diff_eq!(cloud.points[n - 1].hag.unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn too_few_ground_points_is_an_error() {
        let mut cloud = PointCloud::new(vec![
            Point::new(0.0, 0.0, 1.0).with_classification(GROUND_CLASS),
            Point::new(1.0, 0.0, 1.0).with_classification(GROUND_CLASS),
            Point::new(1.0, 1.0, 2.0).with_classification(5),
        ]);

        let normalizer = GroundNormalizer::new(NormalizationConfig::default()).unwrap();
        let err = normalizer.normalize(&mut cloud).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientGround { found: 2 }));
    }

    #[test]
    fn unclassified_cloud_uses_every_point_as_ground() {
        let mut cloud = PointCloud::new(vec![
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(0.0, 1.0, 1.0),
        ]);

        let normalizer = GroundNormalizer::new(NormalizationConfig::default()).unwrap();
        let summary = normalizer.normalize(&mut cloud).unwrap();
        assert!(summary.used_all_points_as_ground);
        for point in &cloud.points {
            assert_abs_diff_eq!(point.hag.unwrap(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn ground_on_shared_grid_lines() {
        // scan lines quantized to the same x
        let mut points = Vec::new();
        for line in 0..3 {
            for k in 0..200 {
                let z = 50.0 + line as f64 * 0.1;
                points.push(
                    Point::new(line as f64, k as f64 * 0.05, z).with_classification(GROUND_CLASS),
                );
            }
        }
        points.push(Point::new(1.0, 5.0, 51.1).with_classification(4));
        let mut cloud = PointCloud::new(points);

        let normalizer = GroundNormalizer::new(NormalizationConfig::default()).unwrap();
        let summary = normalizer.normalize(&mut cloud).unwrap();

        assert_eq!(summary.ground_points, 600);
        let hag = cloud.points.last().unwrap().hag.unwrap();
        assert_abs_diff_eq!(hag, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn supplied_heights_are_kept() {
        let mut points = flat_ground(20.0);
        for i in 0..10 {
            points.push(
                Point::new(0.5 + i as f64 * 0.3, 2.0, 20.8)
                    .with_classification(1)
                    .with_hag(0.8),
            );
        }
        points.push(Point::new(3.5, 3.5, 21.2).with_classification(1));
        let mut cloud = PointCloud::new(points);
        assert!(!cloud.metadata.has_hag);

        let normalizer = GroundNormalizer::new(NormalizationConfig::default()).unwrap();
        let summary = normalizer.normalize(&mut cloud).unwrap();

        assert_eq!(summary.filled, 26);
        let n = cloud.points.len();
        for point in &cloud.points[25..n - 1] {
            assert_eq!(point.hag, Some(0.8));
        }
        assert_abs_diff_eq!(cloud.points[n - 1].hag.unwrap(), 1.2, epsilon = 1e-9);
        assert!(cloud.metadata.has_hag);
    }

    #[test]
    fn unclassified_points_keep_supplied_heights() {
        let mut points: Vec<Point> = (0..10)
            .map(|i| Point::new(i as f64, 0.0, 5.8).with_hag(0.8))
            .collect();
        points.push(Point::new(4.5, 0.5, 5.0));
        let mut cloud = PointCloud::new(points);

        let normalizer = GroundNormalizer::new(NormalizationConfig::default()).unwrap();
        let summary = normalizer.normalize(&mut cloud).unwrap();

        assert!(summary.used_all_points_as_ground);
        assert_eq!(summary.filled, 1);
        assert!(cloud.points[..10].iter().all(|p| p.hag == Some(0.8)));
        assert!(cloud.points[10].hag.is_some());
    }

    #[test]
    fn zero_neighbors_is_rejected() {
        let config = NormalizationConfig {
            neighbors: 0,
            ..Default::default()
        };
        assert!(GroundNormalizer::new(config).is_err());
    }
}
