use crate::reports::{self, FrameRecord};
use clap::Args;
use fastrand::Rng;
use rayon::prelude::*;
use std::time::Instant;
use tactile_recon::acquisition::load_frames;
use tactile_recon::config::Config;
use tactile_recon::contact::ContactMode;
use tactile_recon::pipeline::Reconstructor;
use tactile_recon::ReconResult;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub config: Config,

    /// CSV of recorded frames, one cycle per row.
    #[arg(short, long)]
    pub frames: String,

    /// Per-frame CSV log.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print one JSON object per frame instead of the summary table.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: ReplayArgs, config: Config) -> ReconResult<()> {
    info!("📂 Loading frames: {}", args.frames);
    let frames = load_frames(&args.frames, &config.sensor)?;
    let reconstructor = Reconstructor::from_config(&config)?;
    let seed = config.cloud.sample_seed;

    info!("🔥 Reconstructing {} frames", frames.len());
    let start = Instant::now();

    let reconstructions = frames
        .par_iter()
        .enumerate()
        .map(|(i, frame)| {
            let mut rng = match seed {
                Some(s) => Rng::with_seed(s.wrapping_add(i as u64)),
                None => Rng::new(),
            };
            reconstructor.reconstruct_frame(frame, &mut rng)
        })
        .collect::<ReconResult<Vec<_>>>()?;

    let records: Vec<FrameRecord> = frames
        .iter()
        .zip(reconstructions)
        .enumerate()
        .map(|(frame, (f, reconstruction))| FrameRecord {
            frame,
            reference_force: f.reference_force,
            reconstruction,
        })
        .collect();

    let count = |mode: ContactMode| records.iter().filter(|r| r.reconstruction.mode() == mode).count();
    info!(
        "🏁 Done in {:.2?}: {} point, {} face, {} idle",
        start.elapsed(),
        count(ContactMode::PointContact),
        count(ContactMode::FaceContact),
        count(ContactMode::NoContact)
    );

    if args.json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
    } else {
        reports::print_replay_summary(&records);
    }

    if let Some(path) = &args.output {
        reports::write_frame_log(path, &records)?;
        info!("💾 Frame log written to {}", path);
    }

    Ok(())
}
