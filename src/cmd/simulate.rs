use crate::reports;
use clap::Args;
use fastrand::Rng;
use tactile_recon::acquisition::SensorFrame;
use tactile_recon::config::{parse_f64_array, Config};
use tactile_recon::mixture::MixtureModel;
use tactile_recon::pipeline::Reconstructor;
use tactile_recon::synthetic::render_frame;
use tactile_recon::ReconResult;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: Config,

    /// A known touch as `x,y,variance,weight`; repeat for several.
    #[arg(short, long = "touch", required = true)]
    pub touches: Vec<String>,

    /// Reading of the strongest cell in the rendered frame.
    #[arg(long, default_value_t = 1.0)]
    pub gain: f64,

    /// Sampling seed; falls back to `--sample-seed`, then entropy.
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,
}

fn parse_touches(raw: &[String]) -> ReconResult<MixtureModel> {
    let mut means = Vec::with_capacity(raw.len());
    let mut variances = Vec::with_capacity(raw.len());
    let mut weights = Vec::with_capacity(raw.len());
    for s in raw {
        let [x, y, variance, weight] = parse_f64_array::<4>(s, "touch")?;
        means.push([x, y]);
        variances.push(variance);
        weights.push(weight);
    }
    MixtureModel::from_components(&means, &variances, &weights)
}

pub fn run(args: SimulateArgs, config: Config) -> ReconResult<()> {
    let truth = parse_touches(&args.touches)?;
    let sensor = &config.sensor;
    info!(
        "🧪 Rendering {} touches on a {}x{} grid",
        truth.k(),
        sensor.rows,
        sensor.cols
    );

    let intensity = render_frame(&truth, sensor.rows, sensor.cols, config.cloud.spacing, args.gain)?;
    let frame = SensorFrame::new(intensity);
    reports::print_intensity_grid(&frame.intensity, sensor.threshold);

    let reconstructor = Reconstructor::from_config(&config)?;
    let mut rng = match args.seed.or(config.cloud.sample_seed) {
        Some(s) => Rng::with_seed(s),
        None => Rng::new(),
    };
    let reconstruction = reconstructor.reconstruct_frame(&frame, &mut rng)?;

    info!("🔎 Contact mode: {}", reconstruction.mode());
    reports::print_touch_comparison(&truth, &reconstruction);
    Ok(())
}
