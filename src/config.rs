use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{DetectorResult, FallDetectorError};

// Tuned for a wrist/waist mounted board; adjust to sensor placement
pub const DEFAULT_FREE_FALL_THRESHOLD: f64 = 0.5; // g
pub const DEFAULT_IMPACT_THRESHOLD: f64 = 2.5; // g
pub const DEFAULT_FALL_WINDOW: f64 = 0.6; // seconds

/// Thresholds for the fall classifier, fixed once the classifier is built
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Magnitude below this is free-fall (g)
    pub free_fall_threshold: f64,
    /// Magnitude above this is an impact (g)
    pub impact_threshold: f64,
    /// Max seconds between free-fall onset and impact for a fall
    pub fall_window: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            free_fall_threshold: DEFAULT_FREE_FALL_THRESHOLD,
            impact_threshold: DEFAULT_IMPACT_THRESHOLD,
            fall_window: DEFAULT_FALL_WINDOW,
        }
    }
}

impl DetectorConfig {
    pub fn new(free_fall_threshold: f64, impact_threshold: f64, fall_window: f64) -> Self {
        Self {
            free_fall_threshold,
            impact_threshold,
            fall_window,
        }
    }

    /// Load thresholds from a JSON file. Missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> DetectorResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            FallDetectorError::ConfigFile(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> DetectorResult<Self> {
        serde_json::from_str(text).map_err(|e| FallDetectorError::ConfigFile(e.to_string()))
    }

    /// Apply command line overrides on top of file/default values
    pub fn with_overrides(
        mut self,
        free_fall_threshold: Option<f64>,
        impact_threshold: Option<f64>,
        fall_window: Option<f64>,
    ) -> Self {
        if let Some(v) = free_fall_threshold {
            self.free_fall_threshold = v;
        }
        if let Some(v) = impact_threshold {
            self.impact_threshold = v;
        }
        if let Some(v) = fall_window {
            self.fall_window = v;
        }
        self
    }

    /// Reject misconfiguration instead of correcting it
    pub fn validate(&self) -> DetectorResult<()> {
        let fields = [
            ("free_fall_threshold", self.free_fall_threshold),
            ("impact_threshold", self.impact_threshold),
            ("fall_window", self.fall_window),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(FallDetectorError::InvalidConfig(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        if self.free_fall_threshold >= self.impact_threshold {
            return Err(FallDetectorError::InvalidConfig(format!(
                "free_fall_threshold ({}g) must be below impact_threshold ({}g)",
                self.free_fall_threshold, self.impact_threshold
            )));
        }

        if self.fall_window <= 0.0 {
            return Err(FallDetectorError::InvalidConfig(format!(
                "fall_window must be > 0, got {}s",
                self.fall_window
            )));
        }

        Ok(())
    }

    pub fn describe(&self) -> String {
        format!(
            "Thresholds: FREE_FALL < {}g  |  IMPACT > {}g  |  WINDOW = {}s",
            self.free_fall_threshold, self.impact_threshold, self.fall_window
        )
    }
}
