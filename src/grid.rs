use crate::error::{ReconError, ReconResult};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Row-major 2D matrix addressed as `(row, col)`. Row 0 is the top edge of the sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

/// Contact mask: `true` where a cell reads above the binarization threshold.
pub type BinaryMask = Grid<bool>;
/// Per-cell signal magnitude, aligned cell-for-cell with its mask.
pub type IntensityMatrix = Grid<f64>;
/// Component labels; 0 is background.
pub type LabelMatrix = Grid<u32>;

impl<T: Copy> Grid<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            cells: vec![value; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, cells: Vec<T>) -> ReconResult<Self> {
        if cells.len() != rows * cols {
            return Err(ReconError::invalid(
                "cells",
                format!(
                    "expected {} values for a {}x{} grid, got {}",
                    rows * cols,
                    rows,
                    cols,
                    cells.len()
                ),
            ));
        }
        Ok(Self { rows, cols, cells })
    }

    /// Builds a grid from nested rows. Ragged input is rejected.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> ReconResult<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(ReconError::invalid(
                    "rows",
                    format!("row {} has {} columns, expected {}", i, row.len(), cols),
                ));
            }
            cells.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        debug_assert!(row < self.rows && col < self.cols);
        self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        debug_assert!(row < self.rows && col < self.cols);
        self.cells[row * self.cols + col] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// Yields `(row, col, value)` in raster order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let cols = self.cols.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, &v)| (idx / cols, idx % cols, v))
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }
}

impl<T: Copy> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.cells[row * self.cols + col]
    }
}

impl<T: Copy> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.cells[row * self.cols + col]
    }
}

impl Grid<bool> {
    /// Builds a mask from 0/1 rows, the form masks are usually written in.
    pub fn from_bits<R: AsRef<[u8]>>(rows: &[R]) -> ReconResult<Self> {
        let bits = Grid::<u8>::from_rows(rows)?;
        if let Some(bad) = bits.cells.iter().find(|&&b| b > 1) {
            return Err(ReconError::invalid(
                "mask",
                format!("mask cells must be 0 or 1, found {}", bad),
            ));
        }
        Ok(bits.map(|b| b == 1))
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn is_inactive(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }
}

impl Grid<f64> {
    pub fn binarize(&self, threshold: f64) -> BinaryMask {
        self.map(|v| v >= threshold)
    }

    /// Sum of all readings strictly above `noise_floor`.
    pub fn total_force(&self, noise_floor: f64) -> f64 {
        self.cells.iter().filter(|&&v| v > noise_floor).sum()
    }

    pub fn max_value(&self) -> f64 {
        self.cells.iter().copied().fold(0.0, f64::max)
    }
}

impl Grid<u32> {
    /// Collapses labels back to a mask (any non-zero label is active).
    pub fn to_mask(&self) -> BinaryMask {
        self.map(|l| l != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged() {
        let res = Grid::from_rows(&[vec![1u8, 0], vec![1u8]]);
        assert!(matches!(
            res,
            Err(ReconError::InvalidInput { argument: "rows", .. })
        ));
    }

    #[test]
    fn test_from_bits_rejects_non_binary() {
        let res = BinaryMask::from_bits(&[[0u8, 2]]);
        assert!(res.is_err());
    }

    #[test]
    fn test_cells_raster_order() {
        let g = Grid::from_rows(&[[1, 2, 3], [4, 5, 6]]).unwrap();
        let order: Vec<_> = g.cells().collect();
        assert_eq!(order[0], (0, 0, 1));
        assert_eq!(order[3], (1, 0, 4));
        assert_eq!(order[5], (1, 2, 6));
    }

    #[test]
    fn test_total_force_uses_strict_floor() {
        let g = IntensityMatrix::from_rows(&[[0.15, 0.2], [0.5, 0.0]]).unwrap();
        assert!((g.total_force(0.15) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_binarize_inclusive_threshold() {
        let g = IntensityMatrix::from_rows(&[[0.18, 0.17]]).unwrap();
        let m = g.binarize(0.18);
        assert!(m.get(0, 0));
        assert!(!m.get(0, 1));
    }
}
