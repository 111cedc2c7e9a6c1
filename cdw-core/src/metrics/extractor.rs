use std::time::Instant;

use rayon::prelude::*;

use crate::error::CoreError;
use crate::metrics::cluster::{Cluster, ClusterIndex};
use crate::metrics::config::MetricsConfig;
use crate::metrics::geometry::GeometrySource;
use crate::metrics::row::MetricsRow;
use crate::metrics::{attributes, heuristic, hull, pixel, shape};
use crate::pointcloud::filter::HagFilter;
use crate::pointcloud::point::PointCloud;
use crate::raster::label::LabelRaster;

/// Computes one [`MetricsRow`] per cluster of a label raster.
///
/// Clusters are evaluated independently over shared read-only inputs, either
/// sequentially or on the rayon pool. Rows always come back ordered by
/// cluster id, so both modes produce the same table.
#[derive(Debug, Clone)]
pub struct ClusterMetricsExtractor {
    config: MetricsConfig,
    parallel: bool,
}

impl ClusterMetricsExtractor {
    pub fn new(config: MetricsConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config,
            parallel: true,
        })
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Every cluster of the raster.
    pub fn extract(
        &self,
        raster: &LabelRaster,
        cloud: &PointCloud,
    ) -> Result<Vec<MetricsRow>, CoreError> {
        let index = self.index(raster, cloud);
        let clusters: Vec<&Cluster<'_>> = index.clusters().collect();
        self.run(&clusters, raster)
    }

    /// Only the requested clusters. Every id must exist in the raster.
    pub fn extract_ids(
        &self,
        raster: &LabelRaster,
        cloud: &PointCloud,
        ids: &[u32],
    ) -> Result<Vec<MetricsRow>, CoreError> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let index = self.index(raster, cloud);
        let clusters = index.select(&ids)?;
        self.run(&clusters, raster)
    }

    pub fn extract_cluster(
        &self,
        cluster: &Cluster<'_>,
        raster: &LabelRaster,
    ) -> Result<MetricsRow, CoreError> {
        let pixel = pixel::aggregate(cluster.id, &cluster.cells, raster)?;

        let source = GeometrySource::primary(cluster, raster);
        let shape = shape::analyze(&source);
        let hull = hull::analyze(source, cluster, raster, &pixel);

        let attributes = attributes::summarize(&cluster.points, pixel.area_m2);
        let hag_max = attributes.hag.map(|h| h.basic.max);
        let heuristic = heuristic::score(shape.elongation, hag_max, &self.config);

        Ok(MetricsRow::assemble(
            cluster.id,
            &pixel,
            &shape,
            &hull,
            &attributes,
            &heuristic,
        ))
    }

    fn index<'a>(&self, raster: &LabelRaster, cloud: &'a PointCloud) -> ClusterIndex<'a> {
        let filter = HagFilter {
            hag_min: self.config.hag_min,
        };
        ClusterIndex::build(raster, cloud, &filter)
    }

    fn run(
        &self,
        clusters: &[&Cluster<'_>],
        raster: &LabelRaster,
    ) -> Result<Vec<MetricsRow>, CoreError> {
        let start = Instant::now();

        let mut rows = if self.parallel {
            clusters
                .par_iter()
                .map(|cluster| self.extract_cluster(cluster, raster))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            clusters
                .iter()
                .map(|cluster| self.extract_cluster(cluster, raster))
                .collect::<Result<Vec<_>, _>>()?
        };
        rows.sort_by_key(|row| row.cluster_id);

        let before = rows.len();
        rows.retain(|row| row.area_m2 >= self.config.min_area_m2);
        if rows.len() < before {
            log::info!(
                "dropped {} clusters smaller than {} m2",
                before - rows.len(),
                self.config.min_area_m2
            );
        }

        log::info!(
            "computed metrics for {} clusters in {:?}",
            rows.len(),
            start.elapsed()
        );
        Ok(rows)
    }
}
