use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc::{self, Receiver};
use tokio::time::{interval, Duration};

use fall_detector::live_status::{self, LiveStatus};
use fall_detector::report::{self, OutputFormat};
use fall_detector::sensors::{self, SampleClock};
use fall_detector::{AccelData, Classification, DetectorConfig, FallClassifier};

#[derive(Parser, Debug)]
#[command(name = "fall_detector")]
#[command(about = "Classify accelerometer samples (g) into free-fall, impact and fall events", long_about = None)]
struct Args {
    /// Sample stream, one sample per line (default: stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// JSON file with free_fall_threshold / impact_threshold / fall_window
    #[arg(long)]
    config: Option<PathBuf>,

    /// Free-fall threshold in g (overrides config file)
    #[arg(long)]
    free_fall_threshold: Option<f64>,

    /// Impact threshold in g (overrides config file)
    #[arg(long)]
    impact_threshold: Option<f64>,

    /// Max seconds from free-fall onset to impact (overrides config file)
    #[arg(long)]
    fall_window: Option<f64>,

    /// Output format (text, json)
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Do not print normal-band samples
    #[arg(long)]
    quiet_normal: bool,

    /// Write a live counter snapshot here every 2 seconds and at exit
    #[arg(long)]
    status_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
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
    log::info!("{}", config.describe());

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    // Single consumer: samples reach the classifier strictly in arrival order
    let (accel_tx, mut accel_rx) = mpsc::channel::<AccelData>(500);
    let reader_handle = tokio::spawn(sensors::accel_loop(reader, accel_tx, SampleClock::start()));

    let start = Utc::now();
    let mut status = LiveStatus::new(&config);

    eprintln!("[{}] Fall detection running, waiting for sensor data...", ts_now());
    consume(&mut accel_rx, &mut classifier, &mut status, &args, start).await;

    let (forwarded, unparsed) = reader_handle.await?;
    status.rejected_samples += unparsed;

    if let Some(path) = &args.status_file {
        refresh_status(&mut status, &classifier, start, path);
    }

    eprintln!("\n=== Final Stats ===");
    eprintln!("Samples received: {} ({} unparseable lines)", forwarded, unparsed);
    eprintln!("Normal: {}  Free-fall: {}  Jolts: {}", status.normal, status.free_fall, status.jolts);
    eprintln!("Falls detected: {}", status.falls_detected);
    eprintln!("Rejected samples: {}", status.rejected_samples);

    Ok(())
}

/// Classify until the reader side closes, refreshing the status file on a timer
async fn consume(
    accel_rx: &mut Receiver<AccelData>,
    classifier: &mut FallClassifier,
    status: &mut LiveStatus,
    args: &Args,
    start: chrono::DateTime<Utc>,
) {
    // Ticks even while the input is stalled
    let mut status_tick = interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            received = accel_rx.recv() => {
                let Some(sample) = received else {
                    break;
                };
                handle_sample(classifier, status, &sample, args);
            }
            _ = status_tick.tick() => {
                if let Some(path) = &args.status_file {
                    refresh_status(status, classifier, start, path);
                }
            }
        }
    }
}

fn handle_sample(
    classifier: &mut FallClassifier,
    status: &mut LiveStatus,
    sample: &AccelData,
    args: &Args,
) {
    match classifier.process(sample) {
        Ok(classification) => {
            status.record(&classification);
            let suppress = args.quiet_normal && matches!(classification, Classification::Normal { .. });
            if !suppress {
                println!("{}", report::render(sample, &classification, args.format));
            }
        }
        Err(e) => {
            status.record_rejected();
            eprintln!("[{}] process_sample: Error: {}", ts_now(), e);
        }
    }
}

fn refresh_status(
    status: &mut LiveStatus,
    classifier: &FallClassifier,
    start: chrono::DateTime<Utc>,
    path: &str,
) {
    status.timestamp = live_status::current_timestamp();
    status.uptime_seconds = Utc::now().signed_duration_since(start).num_seconds().max(0) as u64;
    status.tracking_free_fall = classifier.is_tracking();
    if let Err(e) = status.save(path) {
        log::warn!("Failed to write status file {}: {}", path, e);
    }
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
