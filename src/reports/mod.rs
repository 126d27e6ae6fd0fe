use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde::Serialize;
use tactile_recon::contact::ContactMode;
use tactile_recon::grid::IntensityMatrix;
use tactile_recon::mixture::MixtureModel;
use tactile_recon::pipeline::{Reconstruction, ReconstructionOutcome};
use tactile_recon::ReconResult;

/// One replayed frame, as printed and logged.
#[derive(Debug, Serialize)]
pub struct FrameRecord {
    pub frame: usize,
    pub reference_force: Option<f64>,
    pub reconstruction: Reconstruction,
}

fn mode_color(mode: ContactMode) -> Color {
    match mode {
        ContactMode::NoContact => Color::DarkGrey,
        ContactMode::PointContact => Color::Green,
        ContactMode::FaceContact => Color::Yellow,
    }
}

fn format_shares(rec: &Reconstruction) -> String {
    rec.distribution()
        .map(|d| {
            d.force_shares
                .iter()
                .map(|f| format!("{:.3}", f))
                .collect::<Vec<_>>()
                .join(";")
        })
        .unwrap_or_default()
}

fn format_means(rec: &Reconstruction) -> String {
    rec.distribution()
        .map(|d| {
            d.means
                .iter()
                .map(|m| format!("{:.2}:{:.2}", m[0], m[1]))
                .collect::<Vec<_>>()
                .join(";")
        })
        .unwrap_or_default()
}

fn outcome_note(rec: &Reconstruction) -> &'static str {
    match &rec.outcome {
        ReconstructionOutcome::NoContact => "",
        ReconstructionOutcome::FaceContact { .. } => "surface",
        ReconstructionOutcome::NoPointsGenerated { .. } => "too weak",
        ReconstructionOutcome::PointContact(p) if !p.distribution.converged => "not converged",
        ReconstructionOutcome::PointContact(_) => "",
    }
}

pub fn print_intensity_grid(frame: &IntensityMatrix, threshold: f64) {
    println!("\nFrame ({}x{}):", frame.rows(), frame.cols());
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);

    for r in 0..frame.rows() {
        let cells: Vec<Cell> = frame
            .row(r)
            .iter()
            .map(|&v| {
                let cell = Cell::new(format!("{:.2}", v)).set_alignment(CellAlignment::Right);
                if v >= threshold {
                    cell.fg(Color::Cyan).add_attribute(Attribute::Bold)
                } else {
                    cell
                }
            })
            .collect();
        table.add_row(cells);
    }
    println!("{}", table);
}

pub fn print_replay_summary(records: &[FrameRecord]) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Frame").add_attribute(Attribute::Bold),
        Cell::new("Mode").add_attribute(Attribute::Bold),
        Cell::new("Comp"),
        Cell::new("Pat"),
        Cell::new("Force").fg(Color::Cyan),
        Cell::new("Ref"),
        Cell::new("Shares").fg(Color::Green),
        Cell::new("Means"),
        Cell::new("Note"),
    ]);

    for i in [0, 2, 3, 4, 5] {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for record in records {
        let rec = &record.reconstruction;
        table.add_row(vec![
            Cell::new(record.frame),
            Cell::new(rec.mode()).fg(mode_color(rec.mode())),
            Cell::new(rec.analysis.components),
            Cell::new(rec.analysis.patterns),
            Cell::new(format!("{:.3}", rec.total_force)),
            Cell::new(
                record
                    .reference_force
                    .map(|f| format!("{:.3}", f))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(format_shares(rec)),
            Cell::new(format_means(rec)),
            Cell::new(outcome_note(rec)),
        ]);
    }
    println!("\n{}", table);
}

/// True touches next to the estimates. Components are listed in fit order;
/// each estimate is paired with the true touch its mean falls closest to.
pub fn print_touch_comparison(truth: &MixtureModel, rec: &Reconstruction) {
    let Some(dist) = rec.distribution() else {
        println!("\nNo point reconstruction ({}).", rec.mode());
        return;
    };

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Touch").add_attribute(Attribute::Bold),
        Cell::new("True x,y"),
        Cell::new("True w"),
        Cell::new("Est x,y").fg(Color::Green),
        Cell::new("Est w").fg(Color::Green),
        Cell::new("Force").fg(Color::Cyan),
    ]);

    for (i, (mean, (weight, share))) in dist
        .means
        .iter()
        .zip(dist.weights.iter().zip(&dist.force_shares))
        .enumerate()
    {
        let nearest = truth.predict(*mean);
        let t = truth.components()[nearest];
        table.add_row(vec![
            Cell::new(i),
            Cell::new(format!("{:.2},{:.2}", t.mean[0], t.mean[1])),
            Cell::new(format!("{:.3}", t.weight)),
            Cell::new(format!("{:.2},{:.2}", mean[0], mean[1])),
            Cell::new(format!("{:.3}", weight)),
            Cell::new(format!("{:.3}", share)),
        ]);
    }
    println!("\n{}", table);
    println!(
        "Total force {:.3}, distributed {:.3}",
        rec.total_force,
        dist.total_force()
    );
}

/// Writes the per-frame CSV log. Multi-touch fields are `;`-separated.
pub fn write_frame_log(path: &str, records: &[FrameRecord]) -> ReconResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "frame",
        "mode",
        "components",
        "patterns",
        "total_force",
        "reference_force",
        "force_shares",
        "means",
    ])?;

    for record in records {
        let rec = &record.reconstruction;
        wtr.write_record([
            record.frame.to_string(),
            rec.mode().to_string(),
            rec.analysis.components.to_string(),
            rec.analysis.patterns.to_string(),
            format!("{:.6}", rec.total_force),
            record
                .reference_force
                .map(|f| format!("{:.6}", f))
                .unwrap_or_default(),
            format_shares(rec),
            format_means(rec),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
