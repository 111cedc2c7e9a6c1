use std::collections::BTreeMap;
use std::ops::Index;

use crate::error::CoreError;

/// Label value of cells that belong to no cluster.
pub const BACKGROUND: u32 = 0;

/// A row-major grid of connected-component labels.
///
/// Origin is the top-left corner. Cell (r, c) has its centre at
///   x = xmin + (c + 0.5) * res
///   y = ymax - (r + 0.5) * res
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRaster {
    pub nrow: usize,
    pub ncol: usize,
    pub labels: Vec<u32>,
    /// Cell size in map units (square cells).
    pub res: f64,
    pub xmin: f64,
    pub ymax: f64,
}

impl LabelRaster {
    /// Background-filled raster with its origin at (0, nrow * res).
    pub fn new(nrow: usize, ncol: usize, res: f64) -> Result<Self, CoreError> {
        Self::from_vec(nrow, ncol, vec![BACKGROUND; nrow * ncol], res)
    }

    pub fn from_vec(
        nrow: usize,
        ncol: usize,
        labels: Vec<u32>,
        res: f64,
    ) -> Result<Self, CoreError> {
        if labels.len() != nrow * ncol {
            return Err(CoreError::InvalidRaster(format!(
                "expected {} labels for a {}x{} grid, got {}",
                nrow * ncol,
                nrow,
                ncol,
                labels.len()
            )));
        }
        if !res.is_finite() || res <= 0.0 {
            return Err(CoreError::InvalidRaster(format!(
                "resolution must be positive and finite, got {res}"
            )));
        }
        Ok(Self {
            nrow,
            ncol,
            labels,
            res,
            xmin: 0.0,
            ymax: nrow as f64 * res,
        })
    }

    /// Places the top-left corner of the grid at (xmin, ymax).
    pub fn with_origin(mut self, xmin: f64, ymax: f64) -> Self {
        self.xmin = xmin;
        self.ymax = ymax;
        self
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row < self.nrow && col < self.ncol {
            Some(self.labels[row * self.ncol + col])
        } else {
            None
        }
    }

    /// Label at a signed cell position; positions off the grid read as background.
    #[inline]
    pub fn label_or_background(&self, row: isize, col: isize) -> u32 {
        if row < 0 || col < 0 {
            return BACKGROUND;
        }
        self.get(row as usize, col as usize).unwrap_or(BACKGROUND)
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, label: u32) {
        if row < self.nrow && col < self.ncol {
            self.labels[row * self.ncol + col] = label;
        }
    }

    /// Cell containing world (x, y), or `None` outside the grid.
    pub fn xy_to_rc(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.xmin) / self.res).floor();
        let row = ((self.ymax - y) / self.res).floor();
        if col.is_nan() || row.is_nan() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.nrow && col < self.ncol).then_some((row, col))
    }

    /// World coordinates of the cell centre.
    pub fn rc_to_xy(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.xmin + (col as f64 + 0.5) * self.res;
        let y = self.ymax - (row as f64 + 0.5) * self.res;
        (x, y)
    }

    /// Offset of the cell's top-left corner from the grid origin. `(nrow, ncol)`
    /// is valid and addresses the bottom-right corner of the grid.
    pub fn corner_offset(&self, row: usize, col: usize) -> [f64; 2] {
        [col as f64 * self.res, -(row as f64) * self.res]
    }

    /// Offset of a world coordinate from the grid origin.
    pub fn offset_of(&self, x: f64, y: f64) -> [f64; 2] {
        [x - self.xmin, y - self.ymax]
    }

    pub fn cell_area(&self) -> f64 {
        self.res * self.res
    }

    pub fn len(&self) -> usize {
        self.nrow * self.ncol
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cells of every non-background label, keyed and ordered by label.
    pub fn cells_by_label(&self) -> BTreeMap<u32, Vec<(usize, usize)>> {
        let mut cells: BTreeMap<u32, Vec<(usize, usize)>> = BTreeMap::new();
        for (idx, &label) in self.labels.iter().enumerate() {
            if label != BACKGROUND {
                cells
                    .entry(label)
                    .or_default()
                    .push((idx / self.ncol, idx % self.ncol));
            }
        }
        cells
    }
}

impl Index<(usize, usize)> for LabelRaster {
    type Output = u32;
    fn index(&self, (r, c): (usize, usize)) -> &u32 {
        &self.labels[r * self.ncol + c]
    }
}
