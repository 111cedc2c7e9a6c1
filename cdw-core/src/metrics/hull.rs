use crate::metrics::cluster::Cluster;
use crate::metrics::geometry::GeometrySource;
use crate::metrics::pixel::PixelMetrics;
use crate::raster::label::LabelRaster;

/// Hulls thinner than this fraction of their extent are treated as collinear.
const RELATIVE_AREA_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HullMetrics {
    pub convex_area_m2: f64,
    pub convex_perimeter_m: f64,
    /// `area_m2 / convex_area_m2`, unclamped.
    pub solidity: f64,
}

/// Fewer than three non-collinear coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientGeometry;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    /// Counter-clockwise, without the closing vertex.
    pub vertices: Vec<[f64; 2]>,
}

impl ConvexHull {
    /// Andrew's monotone chain.
    pub fn from_coords(coords: &[[f64; 2]]) -> Result<Self, InsufficientGeometry> {
        let mut pts = coords.to_vec();
        pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
        pts.dedup();
        if pts.len() < 3 {
            return Err(InsufficientGeometry);
        }

        let mut lower: Vec<[f64; 2]> = Vec::with_capacity(pts.len());
        for p in &pts {
            while lower.len() >= 2
                && cross(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0.0
            {
                lower.pop();
            }
            lower.push(*p);
        }

        let mut upper: Vec<[f64; 2]> = Vec::with_capacity(pts.len());
        for p in pts.iter().rev() {
            while upper.len() >= 2
                && cross(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0.0
            {
                upper.pop();
            }
            upper.push(*p);
        }

        lower.pop();
        upper.pop();
        lower.extend(upper);

        let hull = Self { vertices: lower };
        if hull.vertices.len() < 3 || hull.area() <= RELATIVE_AREA_EPSILON * hull.extent_sq() {
            return Err(InsufficientGeometry);
        }
        Ok(hull)
    }

    /// Shoelace area, taken relative to the first vertex so projected
    /// coordinates keep their precision.
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        let o = self.vertices[0];
        let twice: f64 = (1..n.saturating_sub(1))
            .map(|i| cross(o, self.vertices[i], self.vertices[i + 1]))
            .sum();
        0.5 * twice.abs()
    }

    /// Squared diagonal of the bounding box.
    fn extent_sq(&self) -> f64 {
        let (mut min, mut max) = ([f64::MAX; 2], [f64::MIN; 2]);
        for v in &self.vertices {
            for k in 0..2 {
                min[k] = min[k].min(v[k]);
                max[k] = max[k].max(v[k]);
            }
        }
        let (dx, dy) = (max[0] - min[0], max[1] - min[1]);
        dx * dx + dy * dy
    }

    pub fn perimeter(&self) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                (b[0] - a[0]).hypot(b[1] - a[1])
            })
            .sum()
    }
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Measures the convex hull, walking the geometry fallback chain until a hull
/// can be built. Always returns a value.
pub fn analyze(
    source: GeometrySource,
    cluster: &Cluster<'_>,
    raster: &LabelRaster,
    pixel: &PixelMetrics,
) -> HullMetrics {
    let mut source = source;
    loop {
        if source == GeometrySource::SelfAsHull {
            log::debug!(
                "cluster {}: convex hull falls back to the cluster itself",
                cluster.id
            );
            return HullMetrics {
                convex_area_m2: pixel.area_m2,
                convex_perimeter_m: pixel.perimeter_m,
                solidity: 1.0,
            };
        }

        match ConvexHull::from_coords(source.coords()) {
            Ok(hull) => {
                let convex_area_m2 = hull.area();
                return HullMetrics {
                    convex_area_m2,
                    convex_perimeter_m: hull.perimeter(),
                    solidity: pixel.area_m2 / convex_area_m2,
                };
            }
            Err(InsufficientGeometry) => {
                let next = source.fallback(cluster, raster);
                log::debug!(
                    "cluster {}: not enough geometry in {} for a hull, trying {}",
                    cluster.id,
                    source.name(),
                    next.name()
                );
                source = next;
            }
        }
    }
}
