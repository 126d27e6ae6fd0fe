use crate::error::{ReconError, ReconResult};
use fastrand::Rng;
use serde::Serialize;
use std::f64::consts::PI;

/// Two independent N(0, 1) draws via Box-Muller.
#[inline]
pub fn standard_normal_pair(rng: &mut Rng) -> (f64, f64) {
    // 1 - u keeps the log argument in (0, 1].
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * PI * u2;
    (r * theta.cos(), r * theta.sin())
}

/// Shape of the per-cell scatter: exp of a bivariate normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogNormalShape {
    mean: [f64; 2],
    cov: [[f64; 2]; 2],
    // Lower Cholesky factor of `cov`.
    chol: [[f64; 2]; 2],
}

impl LogNormalShape {
    pub fn new(mean: [f64; 2], cov: [[f64; 2]; 2]) -> ReconResult<Self> {
        if !mean.iter().all(|m| m.is_finite()) {
            return Err(ReconError::invalid("lognormal_mean", "mean must be finite"));
        }
        let [[a, b], [c, d]] = cov;
        if ![a, b, c, d].iter().all(|v| v.is_finite()) {
            return Err(ReconError::invalid(
                "lognormal_cov",
                "covariance must be finite",
            ));
        }
        if (b - c).abs() > 1e-12 * (1.0 + b.abs().max(c.abs())) {
            return Err(ReconError::invalid(
                "lognormal_cov",
                format!("covariance must be symmetric, got {} vs {}", b, c),
            ));
        }
        let det = a * d - b * c;
        if a <= 0.0 || det <= 0.0 {
            return Err(ReconError::invalid(
                "lognormal_cov",
                format!(
                    "covariance must be positive definite (a = {}, det = {})",
                    a, det
                ),
            ));
        }

        let l11 = a.sqrt();
        let l21 = b / l11;
        let l22 = (d - l21 * l21).sqrt();

        Ok(Self {
            mean,
            cov,
            chol: [[l11, 0.0], [l21, l22]],
        })
    }

    /// Isotropic shape with zero mean.
    pub fn isotropic(variance: f64) -> ReconResult<Self> {
        Self::new([0.0, 0.0], [[variance, 0.0], [0.0, variance]])
    }

    pub fn mean(&self) -> [f64; 2] {
        self.mean
    }

    pub fn cov(&self) -> [[f64; 2]; 2] {
        self.cov
    }

    /// `exp(mean - diag(cov))`, the per-axis mode of the log-normal marginals.
    pub fn mode(&self) -> [f64; 2] {
        [
            (self.mean[0] - self.cov[0][0]).exp(),
            (self.mean[1] - self.cov[1][1]).exp(),
        ]
    }

    /// One draw from the underlying normal.
    pub fn sample_normal(&self, rng: &mut Rng) -> [f64; 2] {
        let (z0, z1) = standard_normal_pair(rng);
        let [[l11, _], [l21, l22]] = self.chol;
        [self.mean[0] + l11 * z0, self.mean[1] + l21 * z0 + l22 * z1]
    }

    /// One log-normal draw shifted so the mode sits at the origin.
    pub fn sample_centered(&self, rng: &mut Rng) -> [f64; 2] {
        let [x, y] = self.sample_normal(rng);
        let mode = self.mode();
        [x.exp() - mode[0], y.exp() - mode[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_indefinite_cov() {
        let res = LogNormalShape::new([0.0, 0.0], [[1.0, 2.0], [2.0, 1.0]]);
        assert!(matches!(
            res,
            Err(ReconError::InvalidInput {
                argument: "lognormal_cov",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_asymmetric_cov() {
        assert!(LogNormalShape::new([0.0, 0.0], [[1.0, 0.2], [0.0, 1.0]]).is_err());
    }

    #[test]
    fn test_mode_matches_closed_form() {
        let s = LogNormalShape::new([0.2, -0.1], [[0.5, 0.0], [0.0, 0.3]]).unwrap();
        let m = s.mode();
        assert!((m[0] - (-0.3f64).exp()).abs() < 1e-12);
        assert!((m[1] - (-0.4f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_normal_moments() {
        let s = LogNormalShape::new([1.0, -2.0], [[0.5, 0.2], [0.2, 0.3]]).unwrap();
        let mut rng = Rng::with_seed(7);
        let n = 40_000;
        let draws: Vec<[f64; 2]> = (0..n).map(|_| s.sample_normal(&mut rng)).collect();
        let mx = draws.iter().map(|p| p[0]).sum::<f64>() / n as f64;
        let my = draws.iter().map(|p| p[1]).sum::<f64>() / n as f64;
        let cxy = draws
            .iter()
            .map(|p| (p[0] - mx) * (p[1] - my))
            .sum::<f64>()
            / n as f64;
        assert!((mx - 1.0).abs() < 0.03);
        assert!((my + 2.0).abs() < 0.03);
        assert!((cxy - 0.2).abs() < 0.03);
    }

    #[test]
    fn test_centered_samples_are_bounded_below() {
        let s = LogNormalShape::isotropic(0.5).unwrap();
        let mode = s.mode();
        let mut rng = Rng::with_seed(1);
        for _ in 0..1000 {
            let p = s.sample_centered(&mut rng);
            assert!(p[0] > -mode[0] && p[1] > -mode[1]);
        }
    }
}
