use crate::error::AnalysisError;
use crate::types::MapBoundary;

/// Per-cell speed accumulator over a fixed map extent.
///
/// Cells are one metre square, row-major, with row 0 at `y_min`. The grid is
/// sized once from the boundary; records falling outside it are dropped.
#[derive(Debug, Clone)]
pub struct SpeedGrid {
    x_min: f64,
    y_min: f64,
    width: usize,
    height: usize,
    sums: Vec<f64>,
    counts: Vec<u32>,
}

impl SpeedGrid {
    pub fn new(boundary: &MapBoundary) -> Result<Self, AnalysisError> {
        let (width, height) = boundary.dimensions()?;
        Ok(Self {
            x_min: boundary.x_min,
            y_min: boundary.y_min,
            width,
            height,
            sums: vec![0.0; width * height],
            counts: vec![0; width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell (cx, cy) containing a position, or None when it lies outside either axis range
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let cx = (x - self.x_min).floor();
        let cy = (y - self.y_min).floor();
        let inside = cx >= 0.0 && cx < self.width as f64 && cy >= 0.0 && cy < self.height as f64;
        inside.then(|| (cx as usize, cy as usize))
    }

    /// Add one speed sample at a position. Returns false if the position was dropped.
    pub fn accumulate(&mut self, x: f64, y: f64, speed: f64) -> bool {
        match self.cell_of(x, y) {
            Some((cx, cy)) => {
                let idx = cy * self.width + cx;
                self.sums[idx] += speed;
                self.counts[idx] += 1;
                true
            }
            None => false,
        }
    }

    pub fn finalize(self) -> MeanSpeedGrid {
        let values = self
            .sums
            .iter()
            .zip(&self.counts)
            .map(|(&sum, &count)| if count == 0 { f64::NAN } else { sum / count as f64 })
            .collect();

        MeanSpeedGrid {
            width: self.width,
            height: self.height,
            values,
            counts: self.counts,
        }
    }
}

/// Mean speed per cell; NaN marks cells that received no samples
#[derive(Debug, Clone)]
pub struct MeanSpeedGrid {
    width: usize,
    height: usize,
    values: Vec<f64>,
    counts: Vec<u32>,
}

impl MeanSpeedGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major cell means, NaN included
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Mean speed of a cell, None when the cell is undefined or out of range
    pub fn value(&self, cx: usize, cy: usize) -> Option<f64> {
        if cx >= self.width || cy >= self.height {
            return None;
        }
        let v = self.values[cy * self.width + cx];
        (!v.is_nan()).then_some(v)
    }

    pub fn count(&self, cx: usize, cy: usize) -> u32 {
        if cx >= self.width || cy >= self.height {
            return 0;
        }
        self.counts[cy * self.width + cx]
    }

    pub fn row(&self, cy: usize) -> &[f64] {
        &self.values[cy * self.width..(cy + 1) * self.width]
    }

    pub fn populated_cells(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// (min, max) over defined cells only; None for an all-undefined grid
    pub fn speed_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
