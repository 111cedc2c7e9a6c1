use crate::metrics::attributes::AttributeSummary;
use crate::metrics::heuristic::HeuristicFlags;
use crate::metrics::hull::HullMetrics;
use crate::metrics::pixel::PixelMetrics;
use crate::metrics::shape::ShapeMetrics;

/// Every descriptor of one cluster.
///
/// All fields are always populated. Attribute statistics are `None` when the
/// cluster had no qualifying value for that attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub cluster_id: u32,
    pub centroid_x: f64,
    pub centroid_y: f64,

    pub pixel_count: usize,
    pub area_m2: f64,
    pub perimeter_m: f64,
    pub compactness: f64,
    pub bbox_height_m: f64,
    pub bbox_width_m: f64,

    pub length_m: f64,
    pub width_m: f64,
    pub orientation_deg: f64,
    pub elongation: f64,

    pub convex_area_m2: f64,
    pub convex_perimeter_m: f64,
    pub solidity: f64,

    pub hag_min_m: Option<f64>,
    pub hag_max_m: Option<f64>,
    pub hag_mean_m: Option<f64>,
    pub hag_std_m: Option<f64>,
    pub hag_median_m: Option<f64>,
    pub hag_p25_m: Option<f64>,
    pub hag_p75_m: Option<f64>,

    pub z_min_m: Option<f64>,
    pub z_max_m: Option<f64>,
    pub z_mean_m: Option<f64>,
    pub z_std_m: Option<f64>,
    pub z_range_m: Option<f64>,

    pub intensity_min: Option<f64>,
    pub intensity_max: Option<f64>,
    pub intensity_mean: Option<f64>,
    pub intensity_std: Option<f64>,

    pub point_count: usize,
    pub point_density_per_m2: f64,

    pub length_width_ratio: f64,
    pub is_elongated: bool,
    pub is_low_height: bool,
    pub cwd_score: f64,
}

impl MetricsRow {
    pub fn assemble(
        cluster_id: u32,
        pixel: &PixelMetrics,
        shape: &ShapeMetrics,
        hull: &HullMetrics,
        attributes: &AttributeSummary,
        heuristic: &HeuristicFlags,
    ) -> Self {
        let hag = attributes.hag;
        let z = attributes.z;
        let intensity = attributes.intensity;

        Self {
            cluster_id,
            centroid_x: pixel.centroid_x,
            centroid_y: pixel.centroid_y,

            pixel_count: pixel.pixel_count,
            area_m2: pixel.area_m2,
            perimeter_m: pixel.perimeter_m,
            compactness: pixel.compactness,
            bbox_height_m: pixel.bbox_height_m,
            bbox_width_m: pixel.bbox_width_m,

            length_m: shape.length_m,
            width_m: shape.width_m,
            orientation_deg: shape.orientation_deg,
            elongation: shape.elongation,

            convex_area_m2: hull.convex_area_m2,
            convex_perimeter_m: hull.convex_perimeter_m,
            solidity: hull.solidity,

            hag_min_m: hag.map(|s| s.basic.min),
            hag_max_m: hag.map(|s| s.basic.max),
            hag_mean_m: hag.map(|s| s.basic.mean),
            hag_std_m: hag.map(|s| s.basic.std),
            hag_median_m: hag.map(|s| s.median),
            hag_p25_m: hag.map(|s| s.p25),
            hag_p75_m: hag.map(|s| s.p75),

            z_min_m: z.map(|s| s.basic.min),
            z_max_m: z.map(|s| s.basic.max),
            z_mean_m: z.map(|s| s.basic.mean),
            z_std_m: z.map(|s| s.basic.std),
            z_range_m: z.map(|s| s.range),

            intensity_min: intensity.map(|s| s.min),
            intensity_max: intensity.map(|s| s.max),
            intensity_mean: intensity.map(|s| s.mean),
            intensity_std: intensity.map(|s| s.std),

            point_count: attributes.point_count,
            point_density_per_m2: attributes.point_density_per_m2,

            length_width_ratio: heuristic.length_width_ratio,
            is_elongated: heuristic.is_elongated,
            is_low_height: heuristic.is_low_height,
            cwd_score: heuristic.cwd_score,
        }
    }
}
