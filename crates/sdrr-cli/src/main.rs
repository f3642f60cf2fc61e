use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use plotters::prelude::*;
use sdrr_lib::{
    analyze,
    io::{csv as csv_io, fit as fit_io, jsonl as jsonl_io},
    DecoderConfig, Record, Sample,
};

/// Scan a heart-rate recording for intervals of abnormal beat-to-beat
/// variability.
#[derive(Parser)]
#[command(name = "sdrr", version, about = "RR-interval variability anomaly scanner")]
struct Cli {
    /// Input recording: .fit, or newline-delimited JSON records
    src: PathBuf,
    /// Dispersion threshold in msec above which a sample is flagged
    #[arg(short = 't', long, default_value_t = 50.0)]
    threshold: f64,
    /// Quartile half-width K; the sliding window holds 4K+1 differences
    #[arg(short = 'k', long, default_value_t = 16)]
    half_width: usize,
    /// Keep decoding through stop events instead of discarding stopped-state history
    #[arg(long)]
    include_stopped: bool,
    /// Where to write the per-sample report (default: input path with .csv)
    #[arg(long)]
    csv_out: Option<PathBuf>,
    /// Suppress warning intervals shorter than this many samples
    #[arg(long, default_value_t = 20)]
    min_warn_len: usize,
    /// Render one Poincaré scatter PNG per significant warning interval here
    #[arg(long)]
    plot_dir: Option<PathBuf>,
    /// Dump the full analysis as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let records = load_records(&cli.src)?;
    let cfg = DecoderConfig {
        half_width: cli.half_width,
        threshold_ms: cli.threshold,
        include_stopped: cli.include_stopped,
    };
    let analysis = analyze(records, cfg)?;

    if !analysis.hrv_observed {
        warn!("no HRV data found in {}", cli.src.display());
        return Ok(());
    }

    let csv_path = cli
        .csv_out
        .clone()
        .unwrap_or_else(|| cli.src.with_extension("csv"));
    let file = File::create(&csv_path)
        .with_context(|| format!("failed to create {}", csv_path.display()))?;
    csv_io::write_samples_csv(file, &analysis.samples)?;

    let significant = analysis.significant_warnings(cli.min_warn_len);
    if let Some(dir) = &cli.plot_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let stem = cli
            .src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".into());
        for (figno, &(start, end)) in significant.iter().enumerate() {
            let out = dir.join(format!("{stem}-{figno}.png"));
            poincare_png(&out, &analysis.samples[start..end])
                .with_context(|| format!("failed to render {}", out.display()))?;
        }
    }
    if !significant.is_empty() {
        warn!("suspicious events found in {}", cli.src.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string(&analysis)?);
    }
    Ok(())
}

fn load_records(path: &Path) -> Result<Vec<Record>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("fit") => fit_io::read_fit_records(path),
        _ => jsonl_io::read_records(path),
    }
}

/// Scatter each beat against its predecessor, the classic visual check for
/// which rhythm irregularity shaped a warning interval.
fn poincare_png(path: &Path, samples: &[Sample]) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let span = match (
        samples.first().and_then(|s| s.timestamp),
        samples.last().and_then(|s| s.timestamp),
    ) {
        (Some(a), Some(b)) => format!("{a} to {b}"),
        _ => format!("{} samples", samples.len()),
    };
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(format!("Poincaré plot, {span}"), ("sans-serif", 20))
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0f64..1000f64, 0f64..1000f64)?;
    chart
        .configure_mesh()
        .x_desc("RR[n](msec)")
        .y_desc("RR[n-1](msec)")
        .draw()?;
    chart.draw_series(
        samples
            .iter()
            .filter_map(|s| s.rr_prev_ms.map(|prev| (s.rr_ms, prev)))
            .map(|(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;
    root.present()?;
    Ok(())
}
