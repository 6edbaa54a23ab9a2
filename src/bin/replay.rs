use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use fall_detector::live_status::LiveStatus;
use fall_detector::report;
use fall_detector::{AccelData, Classification, DetectorConfig, FallClassifier};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::json;

const STANDARD_GRAVITY: f64 = 9.80665; // m/s² per g

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Units {
    /// Axes already in g
    G,
    /// Axes in m/s² (Android / termux-sensor sessions)
    Ms2,
}

#[derive(Parser, Debug)]
struct Args {
    /// Path to comparison_*.json[.gz] session log
    #[arg(long)]
    log: PathBuf,

    /// Accelerometer units in the log
    #[arg(long, value_enum, default_value_t = Units::Ms2)]
    units: Units,

    /// JSON file with detector thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    free_fall_threshold: Option<f64>,

    #[arg(long)]
    impact_threshold: Option<f64>,

    #[arg(long)]
    fall_window: Option<f64>,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Deserialize)]
struct Reading {
    timestamp: f64,
    accel: Option<AccelData>,
}

#[derive(Deserialize)]
struct LogFile {
    readings: Vec<Reading>,
}

struct Summary {
    status: LiveStatus,
    falls: Vec<(f64, f64, f64)>, // (timestamp, magnitude, elapsed)
}

fn load_log(path: &Path) -> anyhow::Result<LogFile> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn run(log: &LogFile, classifier: &mut FallClassifier, units: Units, verbose: bool) -> Summary {
    let scale = match units {
        Units::G => 1.0,
        Units::Ms2 => 1.0 / STANDARD_GRAVITY,
    };
    let mut summary = Summary {
        status: LiveStatus::new(classifier.config()),
        falls: Vec::new(),
    };

    for r in &log.readings {
        let Some(acc) = r.accel.as_ref() else {
            continue;
        };

        let result = classifier.process_sample(acc.x * scale, acc.y * scale, acc.z * scale, r.timestamp);
        match result {
            Ok(classification) => {
                summary.status.record(&classification);
                if let Classification::FallDetected { magnitude, elapsed } = classification {
                    summary.falls.push((r.timestamp, magnitude, elapsed));
                }
                if verbose && !matches!(classification, Classification::Normal { .. }) {
                    println!("t={:.3}s {}", r.timestamp, report::render_text(&classification));
                }
            }
            Err(e) => {
                summary.status.record_rejected();
                eprintln!("[REPLAY] t={:.3}s skipped: {}", r.timestamp, e);
            }
        }
    }

    summary
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let base = match &args.config {
        Some(path) => DetectorConfig::from_file(path)?,
        None => DetectorConfig::default(),
    };
    let config = base.with_overrides(
        args.free_fall_threshold,
        args.impact_threshold,
        args.fall_window,
    );
    let mut classifier = FallClassifier::new(config)?;

    let log = load_log(&args.log)?;
    let summary = run(&log, &mut classifier, args.units, !args.json);

    if args.json {
        let status = &summary.status;
        let out = json!({
            "log": args.log.display().to_string(),
            "samples": status.accel_samples + status.rejected_samples,
            "normal": status.normal,
            "free_fall": status.free_fall,
            "jolts": status.jolts,
            "rejected": status.rejected_samples,
            "peak_magnitude": status.peak_magnitude,
            "falls": summary.falls.iter().map(|(t, m, e)| json!({
                "timestamp": t,
                "magnitude": m,
                "elapsed": e,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("\n=== Replay Summary: {} ===", args.log.display());
        println!("{}", config.describe());
        let status = &summary.status;
        println!(
            "Samples: {}  (rejected {})",
            status.accel_samples + status.rejected_samples,
            status.rejected_samples
        );
        println!(
            "Normal: {}  Free-fall: {}  Jolts: {}  Falls: {}",
            status.normal, status.free_fall, status.jolts, status.falls_detected
        );
        println!("Peak magnitude: {:.3}g", status.peak_magnitude);
    }

    Ok(())
}
