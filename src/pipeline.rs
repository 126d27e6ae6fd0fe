//! One full reconstruction cycle: segment the mask, decide the contact mode
//! and, for point contacts, fit a mixture to the synthetic cloud and split
//! the sensed force across its components.

use crate::acquisition::SensorFrame;
use crate::cloud::{generate_point_cloud, CloudOptions, PointCloud};
use crate::config::Config;
use crate::contact::{analyze, ContactAnalysis, ContactMode};
use crate::error::{ReconError, ReconResult};
use crate::force::{fit_and_distribute, ForceDistribution, ForceOutcome};
use crate::grid::{BinaryMask, Grid, IntensityMatrix};
use crate::mixture::FitOptions;
use fastrand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Reconstructor {
    pub cloud: CloudOptions,
    pub fit: FitOptions,
    pub force_coefficient: f64,
    /// Treat a non-converged fit as an error instead of keeping it.
    pub strict_convergence: bool,
    pub threshold: f64,
    pub noise_floor: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointReconstruction {
    pub point_counts: Grid<usize>,
    #[serde(skip)]
    pub cloud: PointCloud,
    pub cloud_size: usize,
    pub distribution: ForceDistribution,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconstructionOutcome {
    NoContact,
    /// Surface contact: the raw intensity is handed on untouched.
    FaceContact { intensity: IntensityMatrix },
    /// Point contact, but no cell reached `min_points` samples.
    NoPointsGenerated { point_counts: Grid<usize> },
    PointContact(PointReconstruction),
}

#[derive(Debug, Clone, Serialize)]
pub struct Reconstruction {
    pub analysis: ContactAnalysis,
    pub total_force: f64,
    pub outcome: ReconstructionOutcome,
}

impl Reconstruction {
    pub fn mode(&self) -> ContactMode {
        self.analysis.mode
    }

    pub fn distribution(&self) -> Option<&ForceDistribution> {
        match &self.outcome {
            ReconstructionOutcome::PointContact(p) => Some(&p.distribution),
            _ => None,
        }
    }
}

impl Reconstructor {
    pub fn from_config(config: &Config) -> ReconResult<Self> {
        config.sensor.validate()?;
        Ok(Self {
            cloud: config.cloud.cloud_options()?,
            fit: config.mixture.fit_options(),
            force_coefficient: config.mixture.force_coefficient,
            strict_convergence: config.mixture.strict_convergence,
            threshold: config.sensor.threshold,
            noise_floor: config.sensor.noise_floor,
        })
    }

    /// Runs a cycle on an already binarized mask.
    pub fn reconstruct(
        &self,
        mask: &BinaryMask,
        intensity: &IntensityMatrix,
        total_force: f64,
        rng: &mut Rng,
    ) -> ReconResult<Reconstruction> {
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

        let analysis = analyze(mask);
        debug!(
            "Mode {}: {} active cells, {} components, {} split patterns",
            analysis.mode, analysis.active_cells, analysis.components, analysis.patterns
        );

        let outcome = match analysis.mode {
            ContactMode::NoContact => ReconstructionOutcome::NoContact,
            ContactMode::FaceContact => ReconstructionOutcome::FaceContact {
                intensity: intensity.clone(),
            },
            ContactMode::PointContact => {
                self.point_contact(mask, intensity, total_force, &analysis, rng)?
            }
        };

        Ok(Reconstruction {
            analysis,
            total_force,
            outcome,
        })
    }

    /// Binarizes the frame and sums its force with the configured
    /// thresholds, then runs a cycle.
    pub fn reconstruct_frame(&self, frame: &SensorFrame, rng: &mut Rng) -> ReconResult<Reconstruction> {
        let mask = frame.mask(self.threshold);
        let total_force = frame.total_force(self.noise_floor);
        self.reconstruct(&mask, &frame.intensity, total_force, rng)
    }

    fn point_contact(
        &self,
        mask: &BinaryMask,
        intensity: &IntensityMatrix,
        total_force: f64,
        analysis: &ContactAnalysis,
        rng: &mut Rng,
    ) -> ReconResult<ReconstructionOutcome> {
        let (cloud, point_counts) = generate_point_cloud(intensity, mask, &self.cloud, rng)?;
        if cloud.is_empty() {
            return Ok(ReconstructionOutcome::NoPointsGenerated { point_counts });
        }

        // Components whose cells all fell below `min_points` add to k but
        // not to the cloud.
        let mut k = analysis.effective_components();
        if k > cloud.len() {
            warn!(
                "{} components requested for {} points, fitting {}",
                k,
                cloud.len(),
                cloud.len()
            );
            k = cloud.len();
        }
        let result = fit_and_distribute(&cloud, k, total_force, self.force_coefficient, &self.fit);
        let distribution = match result {
            Ok(ForceOutcome::Distributed(dist)) => dist,
            Ok(ForceOutcome::NoPointsGenerated) => {
                return Ok(ReconstructionOutcome::NoPointsGenerated { point_counts })
            }
            Err(ReconError::FitDidNotConverge {
                iterations,
                partial,
            }) if !self.strict_convergence => {
                warn!("Using non-converged fit after {} iterations", iterations);
                ForceDistribution::from_model(
                    *partial,
                    total_force,
                    self.force_coefficient,
                    iterations,
                    false,
                )
            }
            Err(e) => return Err(e),
        };

        Ok(ReconstructionOutcome::PointContact(PointReconstruction {
            point_counts,
            cloud_size: cloud.len(),
            cloud,
            distribution,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstructor() -> Reconstructor {
        Reconstructor::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn test_inactive_mask_is_no_contact() {
        let mask = BinaryMask::filled(3, 3, false);
        let intensity = IntensityMatrix::filled(3, 3, 0.0);
        let mut rng = Rng::with_seed(0);
        let rec = reconstructor()
            .reconstruct(&mask, &intensity, 0.0, &mut rng)
            .unwrap();
        assert_eq!(rec.mode(), ContactMode::NoContact);
        assert!(matches!(rec.outcome, ReconstructionOutcome::NoContact));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mask = BinaryMask::filled(3, 3, true);
        let intensity = IntensityMatrix::filled(3, 4, 1.0);
        let mut rng = Rng::with_seed(0);
        let res = reconstructor().reconstruct(&mask, &intensity, 1.0, &mut rng);
        assert!(matches!(
            res,
            Err(ReconError::InvalidInput {
                argument: "intensity",
                ..
            })
        ));
    }

    #[test]
    fn test_weak_point_contact_generates_nothing() {
        let mask = BinaryMask::from_bits(&[[0u8, 0, 0], [0, 1, 0], [0, 0, 0]]).unwrap();
        let mut intensity = IntensityMatrix::filled(3, 3, 0.0);
        intensity.set(1, 1, 0.195);
        let mut rng = Rng::with_seed(0);
        let rec = reconstructor()
            .reconstruct(&mask, &intensity, 0.195, &mut rng)
            .unwrap();
        assert_eq!(rec.mode(), ContactMode::PointContact);
        match rec.outcome {
            ReconstructionOutcome::NoPointsGenerated { point_counts } => {
                assert_eq!(point_counts.get(1, 1), 19);
            }
            other => panic!("expected NoPointsGenerated, got {:?}", other),
        }
    }

    #[test]
    fn test_more_components_than_points_is_clamped() {
        // 24 isolated cells; only (0, 0) reaches min_points.
        let mut intensity = IntensityMatrix::filled(6, 8, 0.0);
        for i in 0..6 {
            for j in 0..8 {
                if (i + j) % 2 == 0 {
                    intensity.set(i, j, 0.19);
                }
            }
        }
        intensity.set(0, 0, 0.2);
        let frame = SensorFrame::new(intensity);
        let mut rng = Rng::with_seed(0);
        let rec = reconstructor().reconstruct_frame(&frame, &mut rng).unwrap();

        assert_eq!(rec.mode(), ContactMode::PointContact);
        assert_eq!(rec.analysis.effective_components(), 24);
        match &rec.outcome {
            ReconstructionOutcome::PointContact(p) => {
                assert_eq!(p.cloud_size, 20);
                assert_eq!(p.distribution.means.len(), 20);
            }
            other => panic!("expected PointContact, got {:?}", other),
        }
        let expected = 0.575 * (23.0 * 0.19 + 0.2);
        let dist = rec.distribution().unwrap();
        assert!((dist.total_force() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_strict_convergence_propagates() {
        let mut config = Config::default();
        config.mixture.max_iter = 1;
        config.mixture.tol = 0.0;
        config.mixture.strict_convergence = true;
        let strict = Reconstructor::from_config(&config).unwrap();

        let mask = BinaryMask::from_bits(&[[1u8, 0, 1]]).unwrap();
        let intensity = IntensityMatrix::from_rows(&[[1.0, 0.0, 1.0]]).unwrap();
        let mut rng = Rng::with_seed(1);
        let res = strict.reconstruct(&mask, &intensity, 2.0, &mut rng);
        assert!(matches!(res, Err(ReconError::FitDidNotConverge { .. })));

        let lenient = Reconstructor {
            strict_convergence: false,
            ..strict
        };
        let mut rng = Rng::with_seed(1);
        let rec = lenient.reconstruct(&mask, &intensity, 2.0, &mut rng).unwrap();
        let dist = rec.distribution().unwrap();
        assert!(!dist.converged);
        assert!((dist.total_force() - 0.575 * 2.0).abs() < 1e-9);
    }
}
