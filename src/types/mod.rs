use serde::{Deserialize, Serialize};

/// Total acceleration magnitude in g. Does not overflow for finite axes.
pub fn magnitude(x: f64, y: f64, z: f64) -> f64 {
    x.hypot(y).hypot(z)
}

/// Single accelerometer reading, axes in g, timestamp in seconds on a monotonic epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelData {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelData {
    pub fn new(x: f64, y: f64, z: f64, timestamp: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        magnitude(self.x, self.y, self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.timestamp.is_finite()
    }
}

/// Phase assigned to one processed sample
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Classification {
    /// Magnitude inside the normal band
    Normal { magnitude: f64 },
    /// Magnitude collapsed below the free-fall threshold
    FreeFall { magnitude: f64 },
    /// Impact spike within the fall window of a free-fall onset
    FallDetected { magnitude: f64, elapsed: f64 },
    /// Impact spike with no open (or a stale) free-fall episode
    Jolt { magnitude: f64 },
}

impl Classification {
    pub fn magnitude(&self) -> f64 {
        match *self {
            Classification::Normal { magnitude }
            | Classification::FreeFall { magnitude }
            | Classification::FallDetected { magnitude, .. }
            | Classification::Jolt { magnitude } => magnitude,
        }
    }

    /// Free-fall onset to impact duration, only present for a detected fall
    pub fn elapsed(&self) -> Option<f64> {
        match *self {
            Classification::FallDetected { elapsed, .. } => Some(elapsed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Normal { .. } => "normal",
            Classification::FreeFall { .. } => "free_fall",
            Classification::FallDetected { .. } => "fall_detected",
            Classification::Jolt { .. } => "jolt",
        }
    }

    pub fn is_fall(&self) -> bool {
        matches!(self, Classification::FallDetected { .. })
    }
}
