use crate::acquisition::DEFAULT_CHANNEL_MAP;
use crate::cloud::{CloudOptions, LogNormalShape};
use crate::error::{ReconError, ReconResult};
use crate::mixture::FitOptions;
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub sensor: SensorParams,
    #[command(flatten)]
    pub cloud: CloudParams,
    #[command(flatten)]
    pub mixture: MixtureParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorParams {
    #[arg(long, default_value_t = 6)]
    pub rows: usize,
    #[arg(long, default_value_t = 8)]
    pub cols: usize,

    // Readings at or above this are active cells.
    #[arg(long, default_value_t = 0.18)]
    pub threshold: f64,

    // Readings at or below this are left out of the total force.
    #[arg(long, default_value_t = 0.15)]
    pub noise_floor: f64,

    // Unset = channels already in grid order, "deployed" = the 6x8 wiring
    // table, otherwise rows*cols comma-separated source indices.
    #[arg(long)]
    pub channel_map: Option<String>,
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 8,
            threshold: 0.18,
            noise_floor: 0.15,
            channel_map: None,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudParams {
    #[arg(long, default_value_t = 10.0)]
    pub spacing: f64,
    #[arg(long, default_value = "0.0,0.0")]
    pub lognormal_mean: String,
    #[arg(long, default_value = "0.5,0.0,0.0,0.5")]
    pub lognormal_cov: String,
    #[arg(long, default_value_t = 20)]
    pub min_points: usize,
    #[arg(long, default_value_t = 100.0)]
    pub scale_factor: f64,

    // Unset = fresh entropy every run.
    #[arg(long)]
    pub sample_seed: Option<u64>,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            spacing: 10.0,
            lognormal_mean: "0.0,0.0".to_string(),
            lognormal_cov: "0.5,0.0,0.0,0.5".to_string(),
            min_points: 20,
            scale_factor: 100.0,
            sample_seed: None,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixtureParams {
    #[arg(long, default_value_t = 100)]
    pub max_iter: usize,
    #[arg(long, default_value_t = 1e-3)]
    pub tol: f64,
    #[arg(long, default_value_t = 1e-6)]
    pub reg_covar: f64,
    #[arg(long, default_value_t = 1)]
    pub n_init: usize,
    #[arg(long, default_value_t = 0)]
    pub fit_seed: u64,
    #[arg(long, default_value_t = 0.575)]
    pub force_coefficient: f64,

    // Fail the cycle instead of keeping a non-converged fit.
    #[arg(long, default_value_t = false)]
    pub strict_convergence: bool,
}

impl Default for MixtureParams {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            n_init: 1,
            fit_seed: 0,
            force_coefficient: 0.575,
            strict_convergence: false,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ReconResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ReconError::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Copies over only the flags the user actually typed, so a config file
    /// is not clobbered by clap defaults.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(sensor.rows);
        update_if_present!(sensor.cols);
        update_if_present!(sensor.threshold);
        update_if_present!(sensor.noise_floor);
        update_if_present!(sensor.channel_map);

        update_if_present!(cloud.spacing);
        update_if_present!(cloud.lognormal_mean);
        update_if_present!(cloud.lognormal_cov);
        update_if_present!(cloud.min_points);
        update_if_present!(cloud.scale_factor);
        update_if_present!(cloud.sample_seed);

        update_if_present!(mixture.max_iter);
        update_if_present!(mixture.tol);
        update_if_present!(mixture.reg_covar);
        update_if_present!(mixture.n_init);
        update_if_present!(mixture.fit_seed);
        update_if_present!(mixture.force_coefficient);
        update_if_present!(mixture.strict_convergence);
    }
}

impl SensorParams {
    pub fn validate(&self) -> ReconResult<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ReconError::Config(format!(
                "grid must be non-empty, got {}x{}",
                self.rows, self.cols
            )));
        }
        if !self.threshold.is_finite() || !self.noise_floor.is_finite() {
            return Err(ReconError::Config(
                "threshold and noise floor must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn get_channel_map(&self) -> ReconResult<Option<Vec<usize>>> {
        let raw = match self.channel_map.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(raw) => raw,
        };
        let map = match raw {
            "deployed" => DEFAULT_CHANNEL_MAP.to_vec(),
            _ => raw
                .split(',')
                .map(|s| {
                    s.trim().parse::<usize>().map_err(|_| {
                        ReconError::Config(format!("Invalid channel index '{}' in channel_map", s))
                    })
                })
                .collect::<ReconResult<Vec<_>>>()?,
        };

        let n = self.cell_count();
        if map.len() != n {
            return Err(ReconError::Config(format!(
                "channel_map has {} entries, grid has {} cells",
                map.len(),
                n
            )));
        }
        let mut seen = vec![false; n];
        for &src in &map {
            if src >= n || seen[src] {
                return Err(ReconError::Config(format!(
                    "channel_map must be a permutation of 0..{}, bad entry {}",
                    n, src
                )));
            }
            seen[src] = true;
        }
        Ok(Some(map))
    }
}

impl CloudParams {
    pub fn get_shape(&self) -> ReconResult<LogNormalShape> {
        let mean = parse_f64_array::<2>(&self.lognormal_mean, "lognormal_mean")?;
        let cov = parse_f64_array::<4>(&self.lognormal_cov, "lognormal_cov")?;
        LogNormalShape::new(mean, [[cov[0], cov[1]], [cov[2], cov[3]]])
    }

    pub fn cloud_options(&self) -> ReconResult<CloudOptions> {
        let options = CloudOptions {
            spacing: self.spacing,
            shape: self.get_shape()?,
            min_points: self.min_points,
            scale_factor: self.scale_factor,
        };
        options.validate()?;
        Ok(options)
    }
}

impl MixtureParams {
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            max_iter: self.max_iter,
            tol: self.tol,
            reg_covar: self.reg_covar,
            n_init: self.n_init,
            seed: self.fit_seed,
        }
    }
}

pub fn parse_f64_array<const N: usize>(s: &str, name: &str) -> ReconResult<[f64; N]> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != N {
        return Err(ReconError::Config(format!(
            "--{} requires {} values, got {}",
            name.replace('_', "-"),
            N,
            parts.len()
        )));
    }
    let mut arr = [0.0; N];
    for (i, p) in parts.iter().enumerate() {
        arr[i] = p
            .trim()
            .parse()
            .map_err(|_| ReconError::Config(format!("Invalid number '{}' in {}", p.trim(), name)))?;
    }
    Ok(arr)
}
