use crate::pointcloud::point::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HagStats {
    pub basic: BasicStats,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationStats {
    pub basic: BasicStats,
    pub range: f64,
}

/// Statistics over a cluster's qualifying returns. `None` means the cluster
/// had no value for that attribute, as opposed to values that are all zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeSummary {
    pub point_count: usize,
    pub point_density_per_m2: f64,
    pub hag: Option<HagStats>,
    pub z: Option<ElevationStats>,
    pub intensity: Option<BasicStats>,
}

pub fn summarize(points: &[&Point], area_m2: f64) -> AttributeSummary {
    let mut hag: Vec<f64> = points.iter().filter_map(|p| p.hag).collect();
    let z: Vec<f64> = points.iter().map(|p| p.z).collect();
    let intensity: Vec<f64> = points.iter().filter_map(|p| p.intensity()).collect();

    let hag = basic_stats(&hag).map(|basic| {
        hag.sort_by(f64::total_cmp);
        HagStats {
            basic,
            median: percentile_sorted(&hag, 50.0),
            p25: percentile_sorted(&hag, 25.0),
            p75: percentile_sorted(&hag, 75.0),
        }
    });
    let z = basic_stats(&z).map(|basic| ElevationStats {
        basic,
        range: basic.max - basic.min,
    });

    AttributeSummary {
        point_count: points.len(),
        point_density_per_m2: points.len() as f64 / area_m2,
        hag,
        z,
        intensity: basic_stats(&intensity),
    }
}

pub fn basic_stats(values: &[f64]) -> Option<BasicStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    let mean = sum / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

    Some(BasicStats {
        min,
        max,
        mean,
        std: variance.sqrt(),
    })
}

/// Linear interpolation between the closest ranks of an ascending slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
