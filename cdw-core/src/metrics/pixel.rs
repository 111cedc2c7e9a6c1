use std::f64::consts::PI;

use crate::error::CoreError;
use crate::raster::label::LabelRaster;

const NEIGHBORS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelMetrics {
    pub pixel_count: usize,
    pub area_m2: f64,
    pub perimeter_m: f64,
    pub compactness: f64,
    pub bbox_height_m: f64,
    pub bbox_width_m: f64,
    /// Mean of the cell centres, in map coordinates.
    pub centroid_x: f64,
    pub centroid_y: f64,
}

/// Raster-only descriptors of one cluster.
///
/// The perimeter counts boundary cells (cells with a 4-connected neighbour
/// outside the cluster) times the resolution. It is a coarse approximation:
/// diagonal edges are undercounted and straight edges are counted one cell
/// short per corner, so compactness of digitized shapes is biased.
pub fn aggregate(
    cluster_id: u32,
    cells: &[(usize, usize)],
    raster: &LabelRaster,
) -> Result<PixelMetrics, CoreError> {
    if cells.is_empty() {
        return Err(CoreError::DataIntegrity { cluster_id });
    }

    let res = raster.res;
    let mut min_row = usize::MAX;
    let mut max_row = 0;
    let mut min_col = usize::MAX;
    let mut max_col = 0;
    let mut boundary_cells = 0usize;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;

    for &(row, col) in cells {
        min_row = min_row.min(row);
        max_row = max_row.max(row);
        min_col = min_col.min(col);
        max_col = max_col.max(col);

        let is_boundary = NEIGHBORS_4.iter().any(|(dr, dc)| {
            raster.label_or_background(row as isize + dr, col as isize + dc) != cluster_id
        });
        if is_boundary {
            boundary_cells += 1;
        }

        let (x, y) = raster.rc_to_xy(row, col);
        sum_x += x;
        sum_y += y;
    }

    let pixel_count = cells.len();
    let area_m2 = pixel_count as f64 * raster.cell_area();
    let perimeter_m = boundary_cells as f64 * res;
    let compactness = if perimeter_m > 0.0 {
        4.0 * PI * area_m2 / (perimeter_m * perimeter_m)
    } else {
        0.0
    };

    Ok(PixelMetrics {
        pixel_count,
        area_m2,
        perimeter_m,
        compactness,
        bbox_height_m: (max_row - min_row + 1) as f64 * res,
        bbox_width_m: (max_col - min_col + 1) as f64 * res,
        centroid_x: sum_x / pixel_count as f64,
        centroid_y: sum_y / pixel_count as f64,
    })
}
