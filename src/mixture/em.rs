use super::{Component, FitOptions, MixtureModel};
use crate::cloud::Point2;

// Keeps empty components from dividing by zero.
const NK_EPS: f64 = 10.0 * f64::EPSILON;

pub(super) fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.iter().map(|t| (t - max).exp()).sum::<f64>().ln()
}

/// Fills `resp` (row-major, n x k) with posterior responsibilities and
/// returns the mean log-likelihood of the points under `model`.
pub(super) fn e_step(points: &[Point2], model: &MixtureModel, resp: &mut [f64]) -> f64 {
    let k = model.k();
    let mut log_w = vec![0.0; k];
    let mut total = 0.0;

    for (i, p) in points.iter().enumerate() {
        for (c, comp) in model.components().iter().enumerate() {
            log_w[c] = comp.weight.ln() + comp.log_pdf(p);
        }
        let norm = log_sum_exp(&log_w);
        total += norm;
        let row = &mut resp[i * k..(i + 1) * k];
        for c in 0..k {
            row[c] = (log_w[c] - norm).exp();
        }
    }

    total / points.len() as f64
}

/// Re-estimates weights, means and spherical variances from `resp`.
pub(super) fn m_step(points: &[Point2], resp: &[f64], k: usize, reg_covar: f64) -> MixtureModel {
    let mut nk = vec![NK_EPS; k];
    let mut sums = vec![[0.0f64; 2]; k];

    for (i, p) in points.iter().enumerate() {
        let row = &resp[i * k..(i + 1) * k];
        for c in 0..k {
            nk[c] += row[c];
            sums[c][0] += row[c] * p[0];
            sums[c][1] += row[c] * p[1];
        }
    }

    let means: Vec<Point2> = (0..k)
        .map(|c| [sums[c][0] / nk[c], sums[c][1] / nk[c]])
        .collect();

    let mut scatter = vec![0.0f64; k];
    for (i, p) in points.iter().enumerate() {
        let row = &resp[i * k..(i + 1) * k];
        for c in 0..k {
            let dx = p[0] - means[c][0];
            let dy = p[1] - means[c][1];
            scatter[c] += row[c] * (dx * dx + dy * dy);
        }
    }

    let total_nk: f64 = nk.iter().sum();
    let components = (0..k)
        .map(|c| Component {
            mean: means[c],
            // Averaged over both axes.
            variance: scatter[c] / (2.0 * nk[c]) + reg_covar,
            weight: nk[c] / total_nk,
        })
        .collect();

    MixtureModel::from_raw(components)
}

/// One EM run from the given initial responsibilities.
/// Returns `(model, lower_bound, iterations, converged)`.
pub(super) fn run(
    points: &[Point2],
    k: usize,
    mut resp: Vec<f64>,
    options: &FitOptions,
) -> (MixtureModel, f64, usize, bool) {
    let mut model = m_step(points, &resp, k, options.reg_covar);
    let mut lower_bound = f64::NEG_INFINITY;

    for iteration in 1..=options.max_iter {
        let prev = lower_bound;
        lower_bound = e_step(points, &model, &mut resp);
        model = m_step(points, &resp, k, options.reg_covar);

        if (lower_bound - prev).abs() < options.tol {
            return (model, lower_bound, iteration, true);
        }
    }

    (model, lower_bound, options.max_iter, false)
}
