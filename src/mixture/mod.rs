//! Spherical Gaussian mixtures in the sensor plane.
//!
//! `fit` recovers a k-component mixture from a point cloud by EM; the
//! resulting means are touch locations and the weights are the share of the
//! cloud (hence of the sensed intensity) each touch explains.

mod em;
mod init;

use crate::cloud::{Point2, PointCloud};
use crate::error::{ReconError, ReconResult};
use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub mean: Point2,
    /// Per-axis variance; the covariance is `variance * I`.
    pub variance: f64,
    pub weight: f64,
}

impl Component {
    #[inline]
    fn log_pdf(&self, p: &Point2) -> f64 {
        let dx = p[0] - self.mean[0];
        let dy = p[1] - self.mean[1];
        -(2.0 * PI * self.variance).ln() - (dx * dx + dy * dy) / (2.0 * self.variance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureModel {
    components: Vec<Component>,
}

impl MixtureModel {
    /// Builds a mixture from explicit parameters. Weights are normalized to
    /// sum to one.
    pub fn from_components(
        means: &[Point2],
        variances: &[f64],
        weights: &[f64],
    ) -> ReconResult<Self> {
        if means.is_empty() {
            return Err(ReconError::invalid("means", "at least one component is required"));
        }
        if variances.len() != means.len() || weights.len() != means.len() {
            return Err(ReconError::invalid(
                "weights",
                format!(
                    "got {} means, {} variances and {} weights",
                    means.len(),
                    variances.len(),
                    weights.len()
                ),
            ));
        }
        if let Some(v) = variances.iter().find(|v| !v.is_finite() || **v <= 0.0) {
            return Err(ReconError::invalid(
                "variances",
                format!("variances must be positive, found {}", v),
            ));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ReconError::invalid(
                "weights",
                format!("weights must be non-negative, found {}", w),
            ));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(ReconError::invalid("weights", "weights sum to zero"));
        }

        let components = means
            .iter()
            .zip(variances)
            .zip(weights)
            .map(|((&mean, &variance), &w)| Component {
                mean,
                variance,
                weight: w / total,
            })
            .collect();
        Ok(Self { components })
    }

    pub(crate) fn from_raw(components: Vec<Component>) -> Self {
        Self { components }
    }

    pub fn k(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn means(&self) -> Vec<Point2> {
        self.components.iter().map(|c| c.mean).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    pub fn variances(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.variance).collect()
    }

    pub fn log_density(&self, p: Point2) -> f64 {
        let terms: Vec<f64> = self
            .components
            .iter()
            .map(|c| c.weight.ln() + c.log_pdf(&p))
            .collect();
        em::log_sum_exp(&terms)
    }

    pub fn density(&self, p: Point2) -> f64 {
        self.log_density(p).exp()
    }

    /// Posterior probability of each component given `p`.
    pub fn responsibilities(&self, p: Point2) -> Vec<f64> {
        let terms: Vec<f64> = self
            .components
            .iter()
            .map(|c| c.weight.ln() + c.log_pdf(&p))
            .collect();
        let norm = em::log_sum_exp(&terms);
        terms.iter().map(|t| (t - norm).exp()).collect()
    }

    /// Index of the most responsible component.
    pub fn predict(&self, p: Point2) -> usize {
        self.responsibilities(p)
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &r)| if r > best.1 { (i, r) } else { best })
            .0
    }

    /// Density sampled on an inclusive lattice. Row 0 of `values` is the
    /// largest y, matching the sensor's top-down row order.
    pub fn density_grid(
        &self,
        x_range: (f64, f64),
        y_range: (f64, f64),
        step: f64,
    ) -> ReconResult<DensityGrid> {
        if !step.is_finite() || step <= 0.0 {
            return Err(ReconError::invalid("step", format!("step must be positive, got {}", step)));
        }
        let xs = lattice(x_range, step)?;
        let ys = lattice(y_range, step)?;

        let mut values = Grid::filled(ys.len(), xs.len(), 0.0);
        for (row, &y) in ys.iter().rev().enumerate() {
            for (col, &x) in xs.iter().enumerate() {
                values.set(row, col, self.density([x, y]));
            }
        }
        Ok(DensityGrid { xs, ys, values })
    }
}

fn lattice((start, end): (f64, f64), step: f64) -> ReconResult<Vec<f64>> {
    if !start.is_finite() || !end.is_finite() || end < start {
        return Err(ReconError::invalid(
            "range",
            format!("invalid range {}..={}", start, end),
        ));
    }
    let n = ((end - start) / step + 1e-9).floor() as usize + 1;
    Ok((0..n).map(|i| start + i as f64 * step).collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct DensityGrid {
    /// Ascending sample coordinates.
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub values: Grid<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub max_iter: usize,
    /// Convergence threshold on the change of the mean log-likelihood.
    pub tol: f64,
    /// Added to every variance to keep components from collapsing.
    pub reg_covar: f64,
    /// Independent initializations; the best lower bound wins.
    pub n_init: usize,
    pub seed: u64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            n_init: 1,
            seed: 0,
        }
    }
}

impl FitOptions {
    fn validate(&self) -> ReconResult<()> {
        if self.max_iter == 0 {
            return Err(ReconError::invalid("max_iter", "at least one iteration is required"));
        }
        if self.n_init == 0 {
            return Err(ReconError::invalid("n_init", "at least one initialization is required"));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(ReconError::invalid("tol", format!("invalid tolerance {}", self.tol)));
        }
        if !self.reg_covar.is_finite() || self.reg_covar < 0.0 {
            return Err(ReconError::invalid(
                "reg_covar",
                format!("invalid regularization {}", self.reg_covar),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MixtureFit {
    pub model: MixtureModel,
    pub iterations: usize,
    /// Mean per-point log-likelihood at the last E-step.
    pub lower_bound: f64,
}

/// Fits a `k`-component spherical mixture to `cloud`.
///
/// Seeding is deterministic for a given `options.seed`. If no initialization
/// converges within `max_iter`, the best model found is returned inside
/// `ReconError::FitDidNotConverge`.
pub fn fit(cloud: &PointCloud, k: usize, options: &FitOptions) -> ReconResult<MixtureFit> {
    if k < 1 {
        return Err(ReconError::invalid("k", "mixture needs at least one component"));
    }
    if cloud.is_empty() {
        return Err(ReconError::invalid("cloud", "cannot fit an empty point cloud"));
    }
    if cloud.len() < k {
        return Err(ReconError::invalid(
            "k",
            format!("{} components requested for {} points", k, cloud.len()),
        ));
    }
    options.validate()?;

    let points = cloud.points();
    let mut rng = fastrand::Rng::with_seed(options.seed);
    let mut best: Option<(MixtureModel, f64, usize, bool)> = None;

    for init in 0..options.n_init {
        let resp = init::kmeans_responsibilities(points, k, &mut rng);
        let (model, lower_bound, iterations, converged) = em::run(points, k, resp, options);
        debug!(
            "EM init {}: {} iterations, lower bound {:.4}, converged {}",
            init, iterations, lower_bound, converged
        );

        let better = match &best {
            None => true,
            Some((_, lb, _, _)) => lower_bound > *lb,
        };
        if better {
            best = Some((model, lower_bound, iterations, converged));
        }
    }

    // n_init >= 1 guarantees at least one candidate.
    let (model, lower_bound, iterations, converged) = best.ok_or_else(|| {
        ReconError::invalid("n_init", "at least one initialization is required")
    })?;

    if !converged {
        warn!(
            "EM did not converge in {} iterations (lower bound {:.4})",
            iterations, lower_bound
        );
        return Err(ReconError::FitDidNotConverge {
            iterations,
            partial: Box::new(model),
        });
    }

    Ok(MixtureFit {
        model,
        iterations,
        lower_bound,
    })
}
