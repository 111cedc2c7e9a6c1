use crate::metrics::geometry::GeometrySource;

/// Extents below this are treated as zero.
const EXTENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeMetrics {
    pub length_m: f64,
    pub width_m: f64,
    /// Major axis direction in degrees, in `[0, 180)`.
    pub orientation_deg: f64,
    /// `length_m / width_m`; `+inf` for a zero width.
    pub elongation: f64,
}

impl ShapeMetrics {
    fn degenerate() -> Self {
        Self {
            length_m: 0.0,
            width_m: 0.0,
            orientation_deg: 0.0,
            elongation: 0.0,
        }
    }
}

pub fn analyze(source: &GeometrySource) -> ShapeMetrics {
    principal_extents(source.coords())
}

/// Length and width of a coordinate set along its principal axes.
pub fn principal_extents(coords: &[[f64; 2]]) -> ShapeMetrics {
    if count_distinct(coords) < 2 {
        return ShapeMetrics::degenerate();
    }

    let n = coords.len() as f64;
    let mean_x = coords.iter().map(|c| c[0]).sum::<f64>() / n;
    let mean_y = coords.iter().map(|c| c[1]).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for c in coords {
        let dx = c[0] - mean_x;
        let dy = c[1] - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    sxx /= n;
    syy /= n;
    sxy /= n;

    let (vx, vy) = major_axis(sxx, syy, sxy);

    let mut major = (f64::MAX, f64::MIN);
    let mut minor = (f64::MAX, f64::MIN);
    for c in coords {
        let dx = c[0] - mean_x;
        let dy = c[1] - mean_y;
        let a = dx * vx + dy * vy;
        let b = -dx * vy + dy * vx;
        major = (major.0.min(a), major.1.max(a));
        minor = (minor.0.min(b), minor.1.max(b));
    }

    let mut length_m = major.1 - major.0;
    let mut width_m = minor.1 - minor.0;
    let mut angle = vy.atan2(vx).to_degrees();
    if width_m > length_m {
        std::mem::swap(&mut length_m, &mut width_m);
        angle += 90.0;
    }
    if width_m < EXTENT_EPSILON {
        width_m = 0.0;
    }

    let elongation = if width_m == 0.0 {
        f64::INFINITY
    } else {
        length_m / width_m
    };

    ShapeMetrics {
        length_m,
        width_m,
        orientation_deg: fold_axis_angle(angle),
        elongation,
    }
}

/// Unit eigenvector of the dominant eigenvalue of [[sxx, sxy], [sxy, syy]].
fn major_axis(sxx: f64, syy: f64, sxy: f64) -> (f64, f64) {
    let scale = (sxx + syy).max(f64::MIN_POSITIVE);
    if sxy.abs() <= 1e-12 * scale {
        return if sxx >= syy { (1.0, 0.0) } else { (0.0, 1.0) };
    }

    let half_diff = 0.5 * (sxx - syy);
    let lambda = 0.5 * (sxx + syy) + (half_diff * half_diff + sxy * sxy).sqrt();
    let (vx, vy) = (lambda - syy, sxy);
    let norm = vx.hypot(vy);
    (vx / norm, vy / norm)
}

/// Axes are undirected: fold an angle into `[0, 180)`.
fn fold_axis_angle(deg: f64) -> f64 {
    let folded = deg.rem_euclid(180.0);
    if folded >= 180.0 {
        0.0
    } else {
        folded
    }
}

fn count_distinct(coords: &[[f64; 2]]) -> usize {
    match coords.first() {
        None => 0,
        Some(first) if coords.iter().all(|c| c == first) => 1,
        Some(_) => 2,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn grid(cols: usize, rows: usize, step: f64) -> Vec<[f64; 2]> {
        let mut coords = Vec::new();
        for r in 0..=rows {
            for c in 0..=cols {
                coords.push([c as f64 * step, r as f64 * step]);
            }
        }
        coords
    }

    #[test]
    fn square_footprint_is_isotropic() {
        let shape = principal_extents(&grid(10, 10, 0.2));
        assert_relative_eq!(shape.length_m, 2.0, epsilon = 1e-9);
        assert_relative_eq!(shape.width_m, 2.0, epsilon = 1e-9);
        assert_relative_eq!(shape.elongation, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn horizontal_strip() {
        let shape = principal_extents(&grid(50, 1, 0.1));
        assert_relative_eq!(shape.length_m, 5.0, epsilon = 1e-9);
        assert_relative_eq!(shape.width_m, 0.1, epsilon = 1e-9);
        assert_relative_eq!(shape.elongation, 50.0, epsilon = 1e-6);
        assert_relative_eq!(shape.orientation_deg, 0.0);
    }

    #[test]
    fn vertical_strip_points_north() {
        let coords: Vec<[f64; 2]> = grid(50, 1, 0.1).iter().map(|c| [c[1], c[0]]).collect();
        let shape = principal_extents(&coords);
        assert_relative_eq!(shape.length_m, 5.0, epsilon = 1e-9);
        assert_relative_eq!(shape.orientation_deg, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn diagonal_line_orientation_is_folded() {
        let up: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, i as f64]).collect();
        let down: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, -(i as f64)]).collect();

        let up = principal_extents(&up);
        let down = principal_extents(&down);

        assert_relative_eq!(up.orientation_deg, 45.0, epsilon = 1e-9);
        assert_relative_eq!(down.orientation_deg, 135.0, epsilon = 1e-9);
        assert_relative_eq!(up.length_m, 19.0 * 2f64.sqrt(), epsilon = 1e-9);
        assert_eq!(up.width_m, 0.0);
        assert_eq!(up.elongation, f64::INFINITY);
        assert!((0.0..180.0).contains(&down.orientation_deg));
    }

    #[test]
    fn length_is_never_shorter_than_width() {
        let coords = vec![[0.0, 0.0], [0.3, 4.0], [1.1, 0.2], [0.7, 3.1], [0.2, 1.9]];
        let shape = principal_extents(&coords);
        assert!(shape.length_m >= shape.width_m);
        assert!(shape.elongation >= 1.0);
    }

    #[test]
    fn fewer_than_two_distinct_coordinates() {
        assert_eq!(principal_extents(&[]), ShapeMetrics::degenerate());
        let shape = principal_extents(&[[3.0, 4.0], [3.0, 4.0]]);
        assert_eq!(shape.length_m, 0.0);
        assert_eq!(shape.width_m, 0.0);
        assert_eq!(shape.orientation_deg, 0.0);
        assert_eq!(shape.elongation, 0.0);
    }

    #[test]
    fn two_points_are_infinitely_elongated() {
        let shape = principal_extents(&[[0.0, 0.0], [3.0, 4.0]]);
        assert_relative_eq!(shape.length_m, 5.0, epsilon = 1e-12);
        assert_eq!(shape.elongation, f64::INFINITY);
    }
}
