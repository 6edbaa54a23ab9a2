use clap::ValueEnum;
use serde::Serialize;

use crate::types::{AccelData, Classification};

/// Console output style
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines and fall banner
    Text,
    /// One JSON object per sample
    Json,
}

#[derive(Serialize)]
struct ClassifiedSample {
    timestamp: f64,
    #[serde(flatten)]
    classification: Classification,
}

/// Render one classification for the operator console
pub fn render(sample: &AccelData, classification: &Classification, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(classification),
        OutputFormat::Json => render_json(sample.timestamp, classification),
    }
}

pub fn render_text(classification: &Classification) -> String {
    match *classification {
        Classification::Normal { magnitude } => format!("[NORMAL]     mag={:.3}g", magnitude),
        Classification::FreeFall { magnitude } => format!("[FREE-FALL]  mag={:.3}g", magnitude),
        Classification::Jolt { magnitude } => format!(
            "[JOLT]       mag={:.3}g  (no preceding free-fall)",
            magnitude
        ),
        Classification::FallDetected { magnitude, elapsed } => fall_banner(magnitude, elapsed),
    }
}

fn fall_banner(magnitude: f64, elapsed: f64) -> String {
    let rule = "=".repeat(50);
    format!(
        "\n{rule}\n  !! FALL DETECTED !!\n     Impact magnitude : {:.3}g\n     Free-fall → impact : {:.3}s\n{rule}\n",
        magnitude,
        elapsed,
        rule = rule
    )
}

pub fn render_json(timestamp: f64, classification: &Classification) -> String {
    let record = ClassifiedSample {
        timestamp,
        classification: *classification,
    };
    serde_json::to_string(&record).unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
}
