//! Recorded sensor frames.
//!
//! A frame file is a CSV where every record holds the raw channel readings of
//! one cycle, optionally followed by a reference force from an external
//! gauge. A leading header row is tolerated.

use crate::config::SensorParams;
use crate::error::{ReconError, ReconResult};
use crate::grid::{BinaryMask, IntensityMatrix};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Grid-to-channel table of the deployed 6x8 sensor: cell `(i, j)` reads
/// raw channel `DEFAULT_CHANNEL_MAP[i * 8 + j]`.
pub const DEFAULT_CHANNEL_MAP: [usize; 48] = [
    0, 2, 4, 6, 1, 3, 5, 7, //
    14, 12, 10, 8, 9, 11, 13, 15, //
    22, 20, 18, 16, 30, 28, 26, 24, //
    23, 21, 19, 17, 31, 29, 27, 25, //
    38, 36, 34, 32, 46, 44, 42, 40, //
    39, 37, 35, 33, 47, 45, 43, 41,
];

#[derive(Debug, Clone, Serialize)]
pub struct SensorFrame {
    pub intensity: IntensityMatrix,
    pub reference_force: Option<f64>,
}

impl SensorFrame {
    pub fn new(intensity: IntensityMatrix) -> Self {
        Self {
            intensity,
            reference_force: None,
        }
    }

    pub fn mask(&self, threshold: f64) -> BinaryMask {
        self.intensity.binarize(threshold)
    }

    pub fn total_force(&self, noise_floor: f64) -> f64 {
        self.intensity.total_force(noise_floor)
    }
}

/// Reorders raw channel readings into row-major grid order.
pub fn remap_channels(raw: &[f64], map: &[usize]) -> ReconResult<Vec<f64>> {
    if raw.len() != map.len() {
        return Err(ReconError::invalid(
            "channels",
            format!("{} readings for a {}-entry channel map", raw.len(), map.len()),
        ));
    }
    map.iter()
        .map(|&src| {
            raw.get(src).copied().ok_or_else(|| {
                ReconError::invalid("channels", format!("channel {} out of range", src))
            })
        })
        .collect()
}

pub fn load_frames<P: AsRef<Path>>(path: P, sensor: &SensorParams) -> ReconResult<Vec<SensorFrame>> {
    let path = path.as_ref();
    debug!("Loading frames from {}", path.display());
    let file = File::open(path)?;
    load_frames_from_reader(file, sensor)
}

/// Parses frames from any reader. Records with the wrong field count or
/// unparsable numbers are skipped and counted; a non-numeric first record is
/// taken as a header.
pub fn load_frames_from_reader<R: Read>(
    reader: R,
    sensor: &SensorParams,
) -> ReconResult<Vec<SensorFrame>> {
    sensor.validate()?;
    let cells = sensor.cell_count();
    let channel_map = sensor.get_channel_map()?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut frames = Vec::new();
    let mut skipped = 0usize;

    for (row_idx, result) in rdr.records().enumerate() {
        let rec = match result {
            Ok(rec) => rec,
            Err(e) => {
                debug!("[Row {}] CSV parse error: {}", row_idx, e);
                skipped += 1;
                continue;
            }
        };

        if rec.len() != cells && rec.len() != cells + 1 {
            skipped += 1;
            continue;
        }

        let values: Result<Vec<f64>, _> = rec.iter().map(str::parse::<f64>).collect();
        let mut values = match values {
            Ok(v) => v,
            Err(_) => {
                if row_idx > 0 {
                    skipped += 1;
                }
                continue;
            }
        };
        if values.iter().any(|v| !v.is_finite()) {
            skipped += 1;
            continue;
        }

        let reference_force = if values.len() > cells { values.pop() } else { None };
        let readings = match &channel_map {
            Some(map) => remap_channels(&values, map)?,
            None => values,
        };

        frames.push(SensorFrame {
            intensity: IntensityMatrix::from_vec(sensor.rows, sensor.cols, readings)?,
            reference_force,
        });
    }

    if skipped > 0 {
        warn!("Skipped {} invalid rows in frame file", skipped);
    }
    debug!("Loaded {} frames", frames.len());
    Ok(frames)
}
