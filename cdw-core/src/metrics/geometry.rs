use std::collections::BTreeSet;

use crate::metrics::cluster::Cluster;
use crate::raster::label::LabelRaster;

/// The coordinate set a cluster's shape and hull are measured on.
///
/// Coordinates are offsets from the raster's top-left corner, so hull areas of
/// small clusters stay exact at projected-CRS magnitudes.
///
/// Analyzers walk this chain until one source yields a usable result:
/// qualifying returns, then the cells' footprint, then the cluster itself.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    /// XY of the cluster's qualifying returns.
    Points(Vec<[f64; 2]>),
    /// Corners of every cell of the cluster, without duplicates.
    PixelFootprint(Vec<[f64; 2]>),
    /// Nothing to measure; the cluster is treated as its own hull.
    SelfAsHull,
}

impl GeometrySource {
    /// Returns when the cluster has any, its cell footprint otherwise.
    pub fn primary(cluster: &Cluster<'_>, raster: &LabelRaster) -> Self {
        if cluster.points.is_empty() {
            Self::pixel_footprint(cluster, raster)
        } else {
            Self::Points(
                cluster
                    .points
                    .iter()
                    .map(|p| raster.offset_of(p.x, p.y))
                    .collect(),
            )
        }
    }

    pub fn pixel_footprint(cluster: &Cluster<'_>, raster: &LabelRaster) -> Self {
        let corners: BTreeSet<(usize, usize)> = cluster
            .cells
            .iter()
            .flat_map(|&(r, c)| [(r, c), (r, c + 1), (r + 1, c), (r + 1, c + 1)])
            .collect();

        Self::PixelFootprint(
            corners
                .into_iter()
                .map(|(r, c)| raster.corner_offset(r, c))
                .collect(),
        )
    }

    /// Next source in the chain.
    pub fn fallback(&self, cluster: &Cluster<'_>, raster: &LabelRaster) -> Self {
        match self {
            Self::Points(_) => Self::pixel_footprint(cluster, raster),
            Self::PixelFootprint(_) | Self::SelfAsHull => Self::SelfAsHull,
        }
    }

    pub fn coords(&self) -> &[[f64; 2]] {
        match self {
            Self::Points(coords) | Self::PixelFootprint(coords) => coords,
            Self::SelfAsHull => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Points(_) => "points",
            Self::PixelFootprint(_) => "pixel footprint",
            Self::SelfAsHull => "self",
        }
    }
}
