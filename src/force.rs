use crate::cloud::{Point2, PointCloud};
use crate::error::{ReconError, ReconResult};
use crate::mixture::{self, FitOptions, MixtureModel};
use serde::Serialize;
use tracing::debug;

/// Fraction of the summed cell readings attributed to the touches.
pub const DEFAULT_FORCE_COEFFICIENT: f64 = 0.575;

/// Estimated touches for one cycle; index `i` in every vector is mixture
/// component `i`.
#[derive(Debug, Clone, Serialize)]
pub struct ForceDistribution {
    pub means: Vec<Point2>,
    pub weights: Vec<f64>,
    pub force_shares: Vec<f64>,
    pub model: MixtureModel,
    pub iterations: usize,
    pub converged: bool,
}

impl ForceDistribution {
    pub fn from_model(
        model: MixtureModel,
        total_force: f64,
        coefficient: f64,
        iterations: usize,
        converged: bool,
    ) -> Self {
        let force_shares = distribute_force(&model, total_force, coefficient);
        Self {
            means: model.means(),
            weights: model.weights(),
            force_shares,
            model,
            iterations,
            converged,
        }
    }

    pub fn total_force(&self) -> f64 {
        self.force_shares.iter().sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum ForceOutcome {
    /// No cell produced enough samples; nothing to fit.
    NoPointsGenerated,
    Distributed(ForceDistribution),
}

/// `coefficient * total_force * weight_i` for every component.
pub fn distribute_force(model: &MixtureModel, total_force: f64, coefficient: f64) -> Vec<f64> {
    model
        .components()
        .iter()
        .map(|c| coefficient * total_force * c.weight)
        .collect()
}

fn validate_force(total_force: f64, coefficient: f64) -> ReconResult<()> {
    if !total_force.is_finite() || total_force < 0.0 {
        return Err(ReconError::invalid(
            "total_force",
            format!("total force must be finite and non-negative, got {}", total_force),
        ));
    }
    if !coefficient.is_finite() || coefficient < 0.0 {
        return Err(ReconError::invalid(
            "force_coefficient",
            format!("coefficient must be finite and non-negative, got {}", coefficient),
        ));
    }
    Ok(())
}

/// Fits the mixture and apportions the force. An empty cloud short-circuits
/// to `NoPointsGenerated` without touching the fitter.
pub fn fit_and_distribute(
    cloud: &PointCloud,
    k: usize,
    total_force: f64,
    coefficient: f64,
    options: &FitOptions,
) -> ReconResult<ForceOutcome> {
    validate_force(total_force, coefficient)?;
    if k < 1 {
        return Err(ReconError::invalid("k", "mixture needs at least one component"));
    }
    if cloud.is_empty() {
        debug!("Empty point cloud, skipping mixture fit");
        return Ok(ForceOutcome::NoPointsGenerated);
    }

    let fitted = mixture::fit(cloud, k, options)?;
    let dist = ForceDistribution::from_model(
        fitted.model,
        total_force,
        coefficient,
        fitted.iterations,
        true,
    );
    debug!(
        "Distributed {:.3} across {} touches: {:?}",
        dist.total_force(),
        k,
        dist.force_shares
    );
    Ok(ForceOutcome::Distributed(dist))
}
