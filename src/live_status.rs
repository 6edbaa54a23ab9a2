use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::DetectorConfig;
use crate::types::Classification;

/// Running counters for the operator console
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub uptime_seconds: u64,
    pub accel_samples: u64,
    pub normal: u64,
    pub free_fall: u64,
    pub falls_detected: u64,
    pub jolts: u64,
    pub rejected_samples: u64,
    pub tracking_free_fall: bool,
    pub last_fall_magnitude: Option<f64>,
    pub last_fall_elapsed: Option<f64>,
    pub peak_magnitude: f64,
    pub free_fall_threshold: f64,
    pub impact_threshold: f64,
    pub fall_window: f64,
}

impl LiveStatus {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            timestamp: current_timestamp(),
            uptime_seconds: 0,
            accel_samples: 0,
            normal: 0,
            free_fall: 0,
            falls_detected: 0,
            jolts: 0,
            rejected_samples: 0,
            tracking_free_fall: false,
            last_fall_magnitude: None,
            last_fall_elapsed: None,
            peak_magnitude: 0.0,
            free_fall_threshold: config.free_fall_threshold,
            impact_threshold: config.impact_threshold,
            fall_window: config.fall_window,
        }
    }

    pub fn record(&mut self, classification: &Classification) {
        self.accel_samples += 1;
        self.peak_magnitude = self.peak_magnitude.max(classification.magnitude());

        match *classification {
            Classification::Normal { .. } => self.normal += 1,
            Classification::FreeFall { .. } => self.free_fall += 1,
            Classification::Jolt { .. } => self.jolts += 1,
            Classification::FallDetected { magnitude, elapsed } => {
                self.falls_detected += 1;
                self.last_fall_magnitude = Some(magnitude);
                self.last_fall_elapsed = Some(elapsed);
            }
        }
    }

    pub fn record_rejected(&mut self) {
        self.rejected_samples += 1;
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
