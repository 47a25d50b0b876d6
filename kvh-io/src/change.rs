//! Change detection for log emission
//!
//! Decides whether a sample differs enough from the last accepted one to be
//! worth a log line. The comparison is a pure function of the baseline and the
//! sample; [`ChangeDetector`] only holds the baseline between calls.
//!
//! Only CRC-valid samples ever become the new baseline.

use crate::protocol::frame::DecodedSample;
use serde::{Deserialize, Serialize};

/// Significance thresholds (strictly greater than triggers)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeThresholds {
    /// Any gyro axis, rad/s
    pub gyro: f32,
    /// Any accel axis, m/s²
    pub accel: f32,
    /// Interleaved temperature / magnetometer value
    pub temp_mag: f32,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            gyro: 0.01,
            accel: 0.1,
            temp_mag: 0.1,
        }
    }
}

/// Last accepted values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeBaseline {
    pub gyro: [f32; 3],
    /// m/s²
    pub accel: [f32; 3],
    pub temp_mag: f32,
    pub sequence_mod4: u8,
}

impl ChangeBaseline {
    pub fn from_sample(sample: &DecodedSample) -> Self {
        Self {
            gyro: sample.gyro,
            accel: sample.accel_ms2,
            temp_mag: sample.temp_mag_raw,
            sequence_mod4: sample.sequence_mod4,
        }
    }
}

/// Why a sample was judged significant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeReason {
    /// No baseline existed yet
    pub first: bool,
    pub gyro: bool,
    pub accel: bool,
    pub temp_mag: bool,
    /// Auxiliary slot differs from the baseline's
    pub slot: bool,
}

impl ChangeReason {
    pub fn any(&self) -> bool {
        self.first || self.gyro || self.accel || self.temp_mag || self.slot
    }
}

/// Result of one comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeDecision {
    pub should_log: bool,
    pub reason: ChangeReason,
    /// Baseline after this sample (unchanged unless accepted)
    pub baseline: Option<ChangeBaseline>,
    /// True if `baseline` was replaced by this sample
    pub baseline_updated: bool,
}

#[inline]
fn exceeds(a: &[f32; 3], b: &[f32; 3], threshold: f32) -> bool {
    a.iter().zip(b.iter()).any(|(x, y)| (x - y).abs() > threshold)
}

/// Compare `sample` with `baseline`
///
/// A NaN difference never compares greater than a threshold, so NaN fields
/// alone do not trigger a log line.
pub fn evaluate(
    thresholds: &ChangeThresholds,
    baseline: Option<&ChangeBaseline>,
    sample: &DecodedSample,
) -> ChangeDecision {
    let reason = match baseline {
        None => ChangeReason {
            first: true,
            ..ChangeReason::default()
        },
        Some(base) => ChangeReason {
            first: false,
            gyro: exceeds(&sample.gyro, &base.gyro, thresholds.gyro),
            accel: exceeds(&sample.accel_ms2, &base.accel, thresholds.accel),
            temp_mag: (sample.temp_mag_raw - base.temp_mag).abs() > thresholds.temp_mag,
            slot: sample.sequence_mod4 != base.sequence_mod4,
        },
    };

    let should_log = reason.any();
    let accept = should_log && sample.crc_valid;
    ChangeDecision {
        should_log,
        reason,
        baseline: if accept {
            Some(ChangeBaseline::from_sample(sample))
        } else {
            baseline.copied()
        },
        baseline_updated: accept,
    }
}

/// Holds the baseline for one decode session
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    thresholds: ChangeThresholds,
    baseline: Option<ChangeBaseline>,
}

impl ChangeDetector {
    pub fn new(thresholds: ChangeThresholds) -> Self {
        Self {
            thresholds,
            baseline: None,
        }
    }

    pub fn baseline(&self) -> Option<&ChangeBaseline> {
        self.baseline.as_ref()
    }

    pub fn thresholds(&self) -> &ChangeThresholds {
        &self.thresholds
    }

    /// Evaluate a sample and adopt the resulting baseline
    pub fn observe(&mut self, sample: &DecodedSample) -> ChangeDecision {
        let decision = evaluate(&self.thresholds, self.baseline.as_ref(), sample);
        self.baseline = decision.baseline;
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{FrameDecoder, FrameEncoder, FrameFields};

    fn sample(gyro: [f32; 3], accel_g: [f32; 3], temp_mag: f32, sequence: u8) -> DecodedSample {
        let frame = FrameEncoder::default().encode(&FrameFields {
            gyro,
            accel_g,
            temp_mag,
            status: 0x00,
            sequence,
        });
        FrameDecoder::default().decode(frame.as_bytes()).unwrap()
    }

    fn zero_baseline() -> ChangeBaseline {
        ChangeBaseline {
            gyro: [0.0; 3],
            accel: [0.0; 3],
            temp_mag: 0.0,
            sequence_mod4: 0,
        }
    }

    #[test]
    fn test_gyro_threshold() {
        let thresholds = ChangeThresholds::default();
        let base = zero_baseline();

        let small = sample([0.005, 0.0, 0.0], [0.0; 3], 0.0, 0);
        let d = evaluate(&thresholds, Some(&base), &small);
        assert!(!d.should_log);
        assert_eq!(d.baseline, Some(base));
        assert!(!d.baseline_updated);

        let big = sample([0.02, 0.0, 0.0], [0.0; 3], 0.0, 0);
        let d = evaluate(&thresholds, Some(&base), &big);
        assert!(d.should_log);
        assert!(d.reason.gyro);
        assert_eq!(d.baseline.unwrap().gyro, [0.02, 0.0, 0.0]);
    }

    #[test]
    fn test_accel_uses_ms2() {
        let thresholds = ChangeThresholds::default();
        let base = zero_baseline();
        // 0.008 g = 0.078 m/s², below 0.1
        let d = evaluate(&thresholds, Some(&base), &sample([0.0; 3], [0.008, 0.0, 0.0], 0.0, 0));
        assert!(!d.should_log);
        // 0.012 g = 0.118 m/s², above 0.1
        let d = evaluate(&thresholds, Some(&base), &sample([0.0; 3], [0.012, 0.0, 0.0], 0.0, 0));
        assert!(d.should_log && d.reason.accel);
    }

    #[test]
    fn test_temp_mag_and_slot() {
        let thresholds = ChangeThresholds::default();
        let base = zero_baseline();

        let d = evaluate(&thresholds, Some(&base), &sample([0.0; 3], [0.0; 3], 0.05, 0));
        assert!(!d.should_log);
        let d = evaluate(&thresholds, Some(&base), &sample([0.0; 3], [0.0; 3], 0.2, 0));
        assert!(d.reason.temp_mag);

        // Same value, different slot always logs
        let d = evaluate(&thresholds, Some(&base), &sample([0.0; 3], [0.0; 3], 0.0, 1));
        assert!(d.should_log);
        assert!(d.reason.slot);
        assert!(!d.reason.temp_mag);
    }

    #[test]
    fn test_first_sample_logs() {
        let mut detector = ChangeDetector::default();
        let d = detector.observe(&sample([0.0; 3], [0.0; 3], 20.0, 0));
        assert!(d.should_log && d.reason.first);
        assert!(detector.baseline().is_some());
    }

    #[test]
    fn test_crc_failure_never_updates_baseline() {
        let mut detector = ChangeDetector::default();
        detector.observe(&sample([0.1, 0.0, 0.0], [0.0, 0.0, 1.0], 20.0, 0));
        let before = *detector.baseline().unwrap();

        let mut corrupt = sample([500.0, -500.0, 500.0], [80.0, 80.0, 80.0], 1e6, 1);
        corrupt.crc_valid = false;
        let d = detector.observe(&corrupt);
        assert!(d.should_log);
        assert!(!d.baseline_updated);
        assert_eq!(detector.baseline(), Some(&before));

        // Next valid sample is judged against the pre-corruption baseline
        let d = detector.observe(&sample([0.105, 0.0, 0.0], [0.0, 0.0, 1.0], 20.0, 0));
        assert!(!d.should_log);
    }

    #[test]
    fn test_crc_failure_without_baseline() {
        let mut detector = ChangeDetector::default();
        let mut corrupt = sample([1.0; 3], [1.0; 3], 1.0, 0);
        corrupt.crc_valid = false;
        assert!(detector.observe(&corrupt).should_log);
        assert!(detector.baseline().is_none());
    }
}
