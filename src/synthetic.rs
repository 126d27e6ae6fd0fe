use crate::cloud::cell_center;
use crate::error::{ReconError, ReconResult};
use crate::grid::IntensityMatrix;
use crate::mixture::MixtureModel;

/// Renders a sensor frame from a known touch mixture.
///
/// Every cell reads the mixture density at its centre, rescaled so the
/// strongest cell reads exactly `gain`. A mixture too far from the sensor to
/// register anywhere yields an all-zero frame.
pub fn render_frame(
    model: &MixtureModel,
    rows: usize,
    cols: usize,
    spacing: f64,
    gain: f64,
) -> ReconResult<IntensityMatrix> {
    if rows == 0 || cols == 0 {
        return Err(ReconError::invalid("rows", "frame must have at least one cell"));
    }
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(ReconError::invalid(
            "spacing",
            format!("spacing must be positive, got {}", spacing),
        ));
    }
    if !gain.is_finite() || gain < 0.0 {
        return Err(ReconError::invalid(
            "gain",
            format!("gain must be finite and non-negative, got {}", gain),
        ));
    }

    let mut frame = IntensityMatrix::filled(rows, cols, 0.0);
    for i in 0..rows {
        for j in 0..cols {
            frame.set(i, j, model.density(cell_center(i, j, rows, spacing)));
        }
    }

    let peak = frame.max_value();
    if peak > 0.0 {
        Ok(frame.map(|v| v / peak * gain))
    } else {
        Ok(frame)
    }
}
