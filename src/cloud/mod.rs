//! Synthetic point clouds drawn from per-cell intensity.
//!
//! Each active cell contributes a batch of log-normal samples whose size is
//! proportional to its reading. The concatenated cloud is what the mixture
//! fitter sees, so a heavily pressed cell pulls its touch harder.

pub mod normal;

pub use self::normal::LogNormalShape;

use crate::error::{ReconError, ReconResult};
use crate::grid::{BinaryMask, Grid, IntensityMatrix};
use fastrand::Rng;
use serde::Serialize;
use tracing::debug;

pub type Point2 = [f64; 2];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointCloud {
    points: Vec<Point2>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<Point2>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point2> {
        self.points.iter()
    }

    pub fn centroid(&self) -> Option<Point2> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
        Some([sx / n, sy / n])
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CloudOptions {
    /// Physical distance between neighbouring cell centres.
    pub spacing: f64,
    pub shape: LogNormalShape,
    /// Cells that would produce fewer samples than this contribute none.
    pub min_points: usize,
    /// Samples per unit of intensity.
    pub scale_factor: f64,
}

impl CloudOptions {
    pub fn validate(&self) -> ReconResult<()> {
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return Err(ReconError::invalid(
                "spacing",
                format!("spacing must be finite and non-negative, got {}", self.spacing),
            ));
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(ReconError::invalid(
                "scale_factor",
                format!("scale factor must be positive, got {}", self.scale_factor),
            ));
        }
        Ok(())
    }
}

/// Physical centre of cell `(row, col)`: x grows with the column, y grows
/// upward so row 0 sits at the top.
#[inline]
pub fn cell_center(row: usize, col: usize, rows: usize, spacing: f64) -> Point2 {
    [(col + 1) as f64 * spacing, (rows - row) as f64 * spacing]
}

/// Upper bound on the samples a single cell may contribute.
pub const MAX_POINTS_PER_CELL: usize = 1_000_000;

/// Samples a cell would receive before the threshold is applied. Counts above
/// `MAX_POINTS_PER_CELL` are rejected rather than allocated.
pub fn points_for_intensity(intensity: f64, scale_factor: f64) -> ReconResult<usize> {
    let n = (intensity * scale_factor).floor().max(0.0);
    if n > MAX_POINTS_PER_CELL as f64 {
        return Err(ReconError::invalid(
            "intensity",
            format!(
                "reading {} x scale {} exceeds {} points per cell",
                intensity, scale_factor, MAX_POINTS_PER_CELL
            ),
        ));
    }
    Ok(n as usize)
}

/// Builds the fitting cloud for every active cell.
///
/// Returns the cloud and the per-cell sample counts (recorded for every
/// active cell, including ones that fell below `min_points`).
pub fn generate_point_cloud(
    intensity: &IntensityMatrix,
    mask: &BinaryMask,
    options: &CloudOptions,
    rng: &mut Rng,
) -> ReconResult<(PointCloud, Grid<usize>)> {
    if !intensity.same_shape(mask) {
        return Err(ReconError::invalid(
            "intensity",
            format!(
                "shape {:?} does not match mask shape {:?}",
                intensity.shape(),
                mask.shape()
            ),
        ));
    }
    options.validate()?;
    if let Some(bad) = intensity
        .as_slice()
        .iter()
        .find(|v| !v.is_finite() || **v < 0.0)
    {
        return Err(ReconError::invalid(
            "intensity",
            format!("intensity must be finite and non-negative, found {}", bad),
        ));
    }

    let (rows, cols) = mask.shape();
    let mut counts = Grid::filled(rows, cols, 0usize);
    let mut points = Vec::new();
    let mut contributing = 0;

    for (i, j, active) in mask.cells() {
        if !active {
            continue;
        }
        let n = points_for_intensity(intensity.get(i, j), options.scale_factor)?;
        counts.set(i, j, n);
        if n < options.min_points {
            continue;
        }

        contributing += 1;
        let [cx, cy] = cell_center(i, j, rows, options.spacing);
        points.reserve(n);
        for _ in 0..n {
            let [dx, dy] = options.shape.sample_centered(rng);
            points.push([cx + dx, cy + dy]);
        }
    }

    debug!(
        "Point cloud: {} points from {} of {} active cells",
        points.len(),
        contributing,
        mask.active_count()
    );

    Ok((PointCloud { points }, counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(min_points: usize, scale_factor: f64) -> CloudOptions {
        CloudOptions {
            spacing: 10.0,
            shape: LogNormalShape::isotropic(0.5).unwrap(),
            min_points,
            scale_factor,
        }
    }

    #[test]
    fn test_cell_center_flips_rows() {
        assert_eq!(cell_center(0, 0, 6, 10.0), [10.0, 60.0]);
        assert_eq!(cell_center(5, 7, 6, 10.0), [80.0, 10.0]);
    }

    #[test]
    fn test_counts_recorded_below_threshold() {
        let intensity = IntensityMatrix::from_rows(&[[0.15, 0.5]]).unwrap();
        let mask = BinaryMask::from_bits(&[[1u8, 1]]).unwrap();
        let mut rng = Rng::with_seed(3);
        let (cloud, counts) =
            generate_point_cloud(&intensity, &mask, &options(20, 100.0), &mut rng).unwrap();
        assert_eq!(counts.get(0, 0), 15);
        assert_eq!(counts.get(0, 1), 50);
        assert_eq!(cloud.len(), 50);
    }

    #[test]
    fn test_inactive_cells_ignored() {
        let intensity = IntensityMatrix::from_rows(&[[3.0, 3.0]]).unwrap();
        let mask = BinaryMask::from_bits(&[[0u8, 1]]).unwrap();
        let mut rng = Rng::with_seed(3);
        let (cloud, counts) =
            generate_point_cloud(&intensity, &mask, &options(1, 10.0), &mut rng).unwrap();
        assert_eq!(counts.get(0, 0), 0);
        assert_eq!(cloud.len(), 30);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let intensity = IntensityMatrix::filled(2, 2, 1.0);
        let mask = BinaryMask::filled(2, 3, true);
        let mut rng = Rng::with_seed(3);
        let res = generate_point_cloud(&intensity, &mask, &options(1, 10.0), &mut rng);
        assert!(matches!(
            res,
            Err(ReconError::InvalidInput {
                argument: "intensity",
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_reading_rejected() {
        let intensity = IntensityMatrix::filled(1, 1, 1e300);
        let mask = BinaryMask::filled(1, 1, true);
        let mut rng = Rng::with_seed(3);
        let res = generate_point_cloud(&intensity, &mask, &options(20, 100.0), &mut rng);
        assert!(matches!(
            res,
            Err(ReconError::InvalidInput {
                argument: "intensity",
                ..
            })
        ));
        assert_eq!(points_for_intensity(10_000.0, 100.0).unwrap(), MAX_POINTS_PER_CELL);
    }

    #[test]
    fn test_negative_spacing_rejected() {
        let intensity = IntensityMatrix::filled(1, 1, 1.0);
        let mask = BinaryMask::filled(1, 1, true);
        let mut opts = options(1, 10.0);
        opts.spacing = -1.0;
        let mut rng = Rng::with_seed(3);
        let res = generate_point_cloud(&intensity, &mask, &opts, &mut rng);
        assert!(matches!(
            res,
            Err(ReconError::InvalidInput {
                argument: "spacing",
                ..
            })
        ));
    }

    #[test]
    fn test_cloud_clusters_near_cell() {
        let intensity = IntensityMatrix::from_rows(&[[0.0, 0.0], [0.0, 5.0]]).unwrap();
        let mask = intensity.binarize(0.18);
        let mut rng = Rng::with_seed(11);
        let (cloud, _) =
            generate_point_cloud(&intensity, &mask, &options(20, 100.0), &mut rng).unwrap();
        let c = cloud.centroid().unwrap();
        // Log-normal mean sits right of the mode: exp(0.25) - exp(-0.5) ~ 0.68.
        assert!((c[0] - 20.68).abs() < 0.3, "centroid x {}", c[0]);
        assert!((c[1] - 10.68).abs() < 0.3, "centroid y {}", c[1]);
    }
}
