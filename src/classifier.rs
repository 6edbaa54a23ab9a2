//! Free-fall / impact classifier.
//!
//! Every sample is classified from its acceleration magnitude alone, so the
//! result does not depend on how the board is mounted. A fall is a free-fall
//! dip followed by an impact spike no later than `fall_window` seconds after
//! the first dip of the episode.

use crate::config::DetectorConfig;
use crate::error::{DetectorResult, FallDetectorError};
use crate::types::{magnitude, AccelData, Classification};

/// Free-fall episode tracking state
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    /// No open free-fall episode
    Idle,
    /// Free-fall episode open since the first low-g sample
    Tracking { since: f64 },
}

pub struct FallClassifier {
    config: DetectorConfig,
    phase: Phase,
}

impl FallClassifier {
    /// Build a classifier; misconfigured thresholds fail here and never later.
    pub fn new(config: DetectorConfig) -> DetectorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            phase: Phase::Idle,
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: DetectorConfig::default(),
            phase: Phase::Idle,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.phase, Phase::Tracking { .. })
    }

    /// Onset timestamp of the open free-fall episode
    pub fn free_fall_since(&self) -> Option<f64> {
        match self.phase {
            Phase::Tracking { since } => Some(since),
            Phase::Idle => None,
        }
    }

    /// Drop any open episode
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn process(&mut self, sample: &AccelData) -> DetectorResult<Classification> {
        self.process_sample(sample.x, sample.y, sample.z, sample.timestamp)
    }

    /// Classify one sample. Timestamps must be non-decreasing across calls.
    ///
    /// A sample with non-finite axes or timestamp is rejected with
    /// [`FallDetectorError::InvalidSample`] and leaves the state untouched.
    pub fn process_sample(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        timestamp: f64,
    ) -> DetectorResult<Classification> {
        if !(x.is_finite() && y.is_finite() && z.is_finite() && timestamp.is_finite()) {
            let err = FallDetectorError::InvalidSample(format!(
                "x={} y={} z={} t={}",
                x, y, z, timestamp
            ));
            log::warn!("process_sample: {}", err);
            return Err(err);
        }

        let mag = magnitude(x, y, z);
        // Squared norm must fit in f64, anything larger is not a physical reading
        if !(mag * mag).is_finite() {
            let err = FallDetectorError::InvalidSample(format!(
                "magnitude out of range: x={} y={} z={} t={}",
                x, y, z, timestamp
            ));
            log::warn!("process_sample: {}", err);
            return Err(err);
        }

        log::trace!(
            "sample  x={:.3}g  y={:.3}g  z={:.3}g  t={:.3}",
            x,
            y,
            z,
            timestamp
        );

        let (next, classification) = self.transition(mag, timestamp);
        self.phase = next;
        Ok(classification)
    }

    fn transition(&self, mag: f64, now: f64) -> (Phase, Classification) {
        let cfg = &self.config;

        // Free-fall: magnitude collapses toward 0g
        if mag < cfg.free_fall_threshold {
            let next = match self.phase {
                Phase::Idle => {
                    log::debug!("Free-fall phase started  mag={:.3}g  t={:.3}", mag, now);
                    Phase::Tracking { since: now }
                }
                // Keep the first onset so elapsed covers the whole fall
                tracking @ Phase::Tracking { .. } => tracking,
            };
            return (next, Classification::FreeFall { magnitude: mag });
        }

        // Impact: any spike resolves the open episode, expired or not
        if mag > cfg.impact_threshold {
            let classification = match self.phase {
                Phase::Tracking { since } if now - since <= cfg.fall_window => {
                    let elapsed = now - since;
                    log::warn!("FALL DETECTED  mag={:.3}g  elapsed={:.3}s", mag, elapsed);
                    Classification::FallDetected {
                        magnitude: mag,
                        elapsed,
                    }
                }
                _ => {
                    log::debug!("High-g jolt without free-fall  mag={:.3}g", mag);
                    Classification::Jolt { magnitude: mag }
                }
            };
            return (Phase::Idle, classification);
        }

        let next = match self.phase {
            Phase::Tracking { since } if now - since > cfg.fall_window => {
                log::debug!("Free-fall window expired with no impact, resetting");
                Phase::Idle
            }
            other => other,
        };
        (next, Classification::Normal { magnitude: mag })
    }
}

impl Default for FallClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn classifier() -> FallClassifier {
        FallClassifier::new(DetectorConfig::new(0.5, 2.5, 0.6)).unwrap()
    }

    // Magnitude carried entirely on z so the expected value is exact
    fn feed(c: &mut FallClassifier, mag: f64, t: f64) -> Classification {
        c.process_sample(0.0, 0.0, mag, t).unwrap()
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        assert!(FallClassifier::new(DetectorConfig::new(2.5, 0.5, 0.6)).is_err());
        assert!(FallClassifier::new(DetectorConfig::new(0.5, 2.5, 0.0)).is_err());
    }

    #[test]
    fn test_starts_idle() {
        let c = classifier();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.free_fall_since(), None);
    }

    #[test]
    fn test_normal_band_without_episode() {
        let mut c = classifier();
        for (i, mag) in [0.5, 1.0, 1.7, 2.5].iter().enumerate() {
            let result = feed(&mut c, *mag, i as f64 * 0.02);
            assert_eq!(result, Classification::Normal { magnitude: *mag });
        }
        assert!(!c.is_tracking());
    }

    #[test]
    fn test_free_fall_keeps_first_onset() {
        let mut c = classifier();
        assert_eq!(feed(&mut c, 0.1, 0.0), Classification::FreeFall { magnitude: 0.1 });
        assert_eq!(c.free_fall_since(), Some(0.0));
        assert_eq!(feed(&mut c, 0.2, 0.3), Classification::FreeFall { magnitude: 0.2 });
        assert_eq!(c.free_fall_since(), Some(0.0));
    }

    #[test]
    fn test_fall_scenario() {
        let mut c = classifier();
        assert!(matches!(feed(&mut c, 0.1, 0.0), Classification::FreeFall { .. }));
        assert!(matches!(feed(&mut c, 0.2, 0.3), Classification::FreeFall { .. }));

        match feed(&mut c, 3.0, 0.5) {
            Classification::FallDetected { magnitude, elapsed } => {
                assert_eq!(magnitude, 3.0);
                assert_relative_eq!(elapsed, 0.5);
            }
            other => panic!("expected fall, got {:?}", other),
        }
        assert!(!c.is_tracking());

        assert_eq!(feed(&mut c, 1.0, 0.6), Classification::Normal { magnitude: 1.0 });
        assert_eq!(feed(&mut c, 3.0, 1.0), Classification::Jolt { magnitude: 3.0 });
    }

    #[test]
    fn test_expired_episode_then_jolt() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        assert_eq!(feed(&mut c, 1.0, 1.0), Classification::Normal { magnitude: 1.0 });
        assert!(!c.is_tracking());
        assert_eq!(feed(&mut c, 3.0, 1.1), Classification::Jolt { magnitude: 3.0 });
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        let result = feed(&mut c, 3.0, 0.6);
        assert!(result.is_fall());
        assert_relative_eq!(result.elapsed().unwrap(), 0.6);
    }

    #[test]
    fn test_impact_past_window_is_jolt_and_clears() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        assert_eq!(feed(&mut c, 3.0, 0.7), Classification::Jolt { magnitude: 3.0 });
        assert!(!c.is_tracking());
    }

    #[test]
    fn test_normal_inside_window_keeps_episode() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        assert_eq!(feed(&mut c, 1.0, 0.4), Classification::Normal { magnitude: 1.0 });
        assert_eq!(c.free_fall_since(), Some(0.0));
        assert!(feed(&mut c, 3.0, 0.55).is_fall());
    }

    #[test]
    fn test_normal_at_window_edge_does_not_expire() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        feed(&mut c, 1.0, 0.6);
        assert!(c.is_tracking());
    }

    #[test]
    fn test_jolt_without_free_fall() {
        let mut c = classifier();
        feed(&mut c, 1.0, 0.0);
        assert_eq!(feed(&mut c, 4.0, 0.02), Classification::Jolt { magnitude: 4.0 });
    }

    #[test]
    fn test_no_elapsed_carryover_after_fall() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        assert!(feed(&mut c, 3.0, 0.2).is_fall());
        let next = feed(&mut c, 1.0, 0.25);
        assert_eq!(next, Classification::Normal { magnitude: 1.0 });
        assert_eq!(next.elapsed(), None);
        assert_eq!(c.free_fall_since(), None);
    }

    #[test]
    fn test_new_episode_after_expiry_uses_new_onset() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        feed(&mut c, 1.0, 1.0);
        feed(&mut c, 0.1, 2.0);
        assert_eq!(c.free_fall_since(), Some(2.0));
        let result = feed(&mut c, 3.0, 2.25);
        assert_relative_eq!(result.elapsed().unwrap(), 0.25);
    }

    #[test]
    fn test_repeated_dips_past_window_stay_tracking() {
        // Low-g samples never expire the episode; only the impact decides
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        feed(&mut c, 0.1, 0.5);
        feed(&mut c, 0.1, 1.0);
        assert_eq!(c.free_fall_since(), Some(0.0));
        assert!(matches!(feed(&mut c, 3.0, 1.1), Classification::Jolt { .. }));
    }

    #[test]
    fn test_three_axis_magnitude() {
        let mut c = classifier();
        let result = c.process_sample(2.0, -2.0, 1.0, 0.0).unwrap();
        assert!(matches!(result, Classification::Jolt { .. }));
        assert_relative_eq!(result.magnitude(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_overflowing_sample_rejected_episode_kept() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);

        let err = c.process_sample(1e200, 0.0, 0.0, 0.1).unwrap_err();
        assert!(matches!(err, FallDetectorError::InvalidSample(_)));
        assert_eq!(c.free_fall_since(), Some(0.0));

        let err = c.process_sample(f64::MAX, f64::MAX, 0.0, 0.15).unwrap_err();
        assert!(matches!(err, FallDetectorError::InvalidSample(_)));

        // A real impact afterwards still resolves the episode as a fall
        let result = feed(&mut c, 3.0, 0.2);
        assert!(result.is_fall());
        assert!(result.magnitude().is_finite());
    }

    #[test]
    fn test_non_finite_sample_rejected_state_untouched() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);

        let err = c.process_sample(f64::NAN, 0.0, 0.0, 0.1).unwrap_err();
        assert!(matches!(err, FallDetectorError::InvalidSample(_)));
        assert_eq!(c.free_fall_since(), Some(0.0));

        assert!(c.process_sample(0.0, f64::INFINITY, 0.0, 0.2).is_err());
        assert!(c.process_sample(0.0, 0.0, 3.0, f64::NAN).is_err());
        assert!(c.is_tracking());

        // Stream continues as if the bad samples never arrived
        assert!(feed(&mut c, 3.0, 0.3).is_fall());
    }

    #[test]
    fn test_reset_clears_episode() {
        let mut c = classifier();
        feed(&mut c, 0.1, 0.0);
        c.reset();
        assert_eq!(c.phase(), Phase::Idle);
        assert!(matches!(feed(&mut c, 3.0, 0.1), Classification::Jolt { .. }));
    }

    #[test]
    fn test_process_accel_data() {
        let mut c = FallClassifier::default();
        let result = c.process(&AccelData::new(0.0, 0.0, 0.05, 10.0)).unwrap();
        assert!(matches!(result, Classification::FreeFall { .. }));
        assert_eq!(c.free_fall_since(), Some(10.0));
    }
}
