use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::pointcloud::filter::PointFilter;
use crate::pointcloud::point::{Point, PointCloud};
use crate::raster::label::{LabelRaster, BACKGROUND};

/// One connected component of the label raster and the qualifying returns
/// that fall on its cells.
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    pub id: u32,
    pub cells: Vec<(usize, usize)>,
    pub points: Vec<&'a Point>,
}

/// Where the input returns ended up while building a [`ClusterIndex`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentStats {
    pub total: usize,
    pub outside_raster: usize,
    pub background: usize,
    pub filtered: usize,
    pub assigned: usize,
}

#[derive(Debug)]
pub struct ClusterIndex<'a> {
    clusters: BTreeMap<u32, Cluster<'a>>,
    pub stats: AssignmentStats,
}

impl<'a> ClusterIndex<'a> {
    pub fn build<F: PointFilter>(raster: &LabelRaster, cloud: &'a PointCloud, filter: &F) -> Self {
        let mut clusters: BTreeMap<u32, Cluster<'a>> = raster
            .cells_by_label()
            .into_iter()
            .map(|(id, cells)| {
                (
                    id,
                    Cluster {
                        id,
                        cells,
                        points: Vec::new(),
                    },
                )
            })
            .collect();

        let mut stats = AssignmentStats {
            total: cloud.points.len(),
            ..Default::default()
        };

        for point in &cloud.points {
            let Some((row, col)) = raster.xy_to_rc(point.x, point.y) else {
                stats.outside_raster += 1;
                continue;
            };
            let label = raster[(row, col)];
            if label == BACKGROUND {
                stats.background += 1;
                continue;
            }
            if !filter.accepts(point) {
                stats.filtered += 1;
                continue;
            }
            if let Some(cluster) = clusters.get_mut(&label) {
                cluster.points.push(point);
                stats.assigned += 1;
            }
        }

        log::info!(
            "clusters: {}, points assigned: {} / {} (outside raster: {}, background: {}, below hag_min: {})",
            clusters.len(),
            stats.assigned,
            stats.total,
            stats.outside_raster,
            stats.background,
            stats.filtered
        );

        Self { clusters, stats }
    }

    pub fn get(&self, id: u32) -> Option<&Cluster<'a>> {
        self.clusters.get(&id)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster<'a>> {
        self.clusters.values()
    }

    /// Looks up every requested id. A label the raster does not contain is a
    /// data integrity failure, never silently skipped.
    pub fn select(&self, ids: &[u32]) -> Result<Vec<&Cluster<'a>>, CoreError> {
        ids.iter()
            .map(|&id| {
                self.clusters
                    .get(&id)
                    .ok_or(CoreError::DataIntegrity { cluster_id: id })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointcloud::filter::HagFilter;

    fn raster() -> LabelRaster {
        // 0 1 1
        // 0 2 0
        LabelRaster::from_vec(2, 3, vec![0, 1, 1, 0, 2, 0], 1.0).unwrap()
    }

    #[test]
    fn points_are_assigned_to_the_cluster_under_them() {
        let cloud = PointCloud::new(vec![
            Point::new(1.5, 1.5, 10.0).with_hag(0.4),
            Point::new(2.2, 1.9, 10.0).with_hag(0.6),
            Point::new(1.5, 0.5, 10.0).with_hag(0.3),
            Point::new(1.5, 0.5, 10.0).with_hag(0.01),
            Point::new(0.5, 0.5, 10.0).with_hag(0.5),
            Point::new(9.0, 9.0, 10.0).with_hag(0.5),
        ]);
        let raster = raster();

        let index = ClusterIndex::build(&raster, &cloud, &HagFilter { hag_min: 0.1 });

        let ids: Vec<u32> = index.clusters().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(index.get(1).unwrap().points.len(), 2);
        assert_eq!(index.get(2).unwrap().points.len(), 1);
        assert_eq!(index.get(1).unwrap().cells, vec![(0, 1), (0, 2)]);
        assert_eq!(
            index.stats,
            AssignmentStats {
                total: 6,
                outside_raster: 1,
                background: 1,
                filtered: 1,
                assigned: 3,
            }
        );
    }

    #[test]
    fn selecting_an_absent_label_fails() {
        let cloud = PointCloud::empty();
        let raster = raster();
        let index = ClusterIndex::build(&raster, &cloud, &HagFilter { hag_min: 0.0 });

        assert_eq!(index.select(&[2, 1]).unwrap().len(), 2);
        let err = index.select(&[1, 42]).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity { cluster_id: 42 }));
    }
}
