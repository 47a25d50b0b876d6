//! Per-field physical range checks
//!
//! A field outside its range is flagged on the sample; the frame itself is
//! still forwarded.

use crate::interleave::AuxSlot;
use crate::protocol::constants::SEQUENCE_MAX;
use crate::protocol::frame::DecodedSample;
use serde::{Deserialize, Serialize};

/// Declared physical ranges (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRanges {
    /// Temperature slot, °C
    pub temperature: [f32; 2],
    /// Each magnetometer slot, Gauss
    pub magnetic: [f32; 2],
}

impl Default for ValidationRanges {
    fn default() -> Self {
        Self {
            temperature: [-40.0, 75.0],
            magnetic: [-10.0, 10.0],
        }
    }
}

/// Validity of the individual fields of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldValidity {
    /// Gyro axes: status reports valid and value finite
    pub gyro: [bool; 3],
    /// Accel axes: status reports valid and value finite
    pub accel: [bool; 3],
    /// Interleaved value within the range of its slot
    pub aux: bool,
    /// Sequence within 0..=127
    pub sequence: bool,
}

impl Default for FieldValidity {
    fn default() -> Self {
        Self {
            gyro: [true; 3],
            accel: [true; 3],
            aux: true,
            sequence: true,
        }
    }
}

impl FieldValidity {
    /// True if every field passed
    pub fn all_valid(&self) -> bool {
        self.aux && self.sequence && self.gyro.iter().chain(self.accel.iter()).all(|&v| v)
    }

    /// Number of fields marked invalid
    pub fn invalid_count(&self) -> usize {
        self.gyro
            .iter()
            .chain(self.accel.iter())
            .chain([self.aux, self.sequence].iter())
            .filter(|&&v| !v)
            .count()
    }
}

#[inline]
fn within(value: f32, range: [f32; 2]) -> bool {
    value >= range[0] && value <= range[1]
}

/// Marks out-of-range fields on decoded samples
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationRangeChecker {
    ranges: ValidationRanges,
}

impl ValidationRangeChecker {
    pub fn new(ranges: ValidationRanges) -> Self {
        Self { ranges }
    }

    /// Range check for an interleaved value in a given slot (NaN is out of range)
    pub fn aux_in_range(&self, slot: AuxSlot, value: f32) -> bool {
        match slot {
            AuxSlot::Temperature => within(value, self.ranges.temperature),
            AuxSlot::MagX | AuxSlot::MagY | AuxSlot::MagZ => within(value, self.ranges.magnetic),
        }
    }

    /// Compute the validity of every field and store it on the sample
    pub fn check(&self, sample: &mut DecodedSample) -> FieldValidity {
        let status = sample.status;
        let validity = FieldValidity {
            gyro: [0, 1, 2].map(|i| status.gyro_valid[i] && sample.gyro[i].is_finite()),
            accel: [0, 1, 2].map(|i| status.accel_valid[i] && sample.accel_g[i].is_finite()),
            aux: self.aux_in_range(sample.aux_slot(), sample.temp_mag_raw),
            sequence: sample.sequence <= SEQUENCE_MAX,
        };
        sample.validity = validity;
        validity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{FrameDecoder, FrameEncoder, FrameFields};

    fn decode(temp_mag: f32, sequence: u8) -> DecodedSample {
        let fields = FrameFields {
            gyro: [0.0; 3],
            accel_g: [0.0, 0.0, 1.0],
            temp_mag,
            status: 0x00,
            sequence,
        };
        let frame = FrameEncoder::default().encode(&fields);
        FrameDecoder::default().decode(frame.as_bytes()).unwrap()
    }

    #[test]
    fn test_temperature_bounds() {
        let checker = ValidationRangeChecker::default();
        assert!(checker.check(&mut decode(-40.0, 0)).aux);
        assert!(checker.check(&mut decode(75.0, 4)).aux);
        assert!(!checker.check(&mut decode(75.5, 8)).aux);
        assert!(!checker.check(&mut decode(-41.0, 0)).aux);
    }

    #[test]
    fn test_magnetic_bounds() {
        let checker = ValidationRangeChecker::default();
        assert!(checker.check(&mut decode(10.0, 1)).aux);
        assert!(checker.check(&mut decode(-10.0, 2)).aux);
        assert!(!checker.check(&mut decode(10.01, 3)).aux);
        // 30 is a sane temperature but not a sane field strength
        assert!(!checker.check(&mut decode(30.0, 1)).aux);
        assert!(checker.check(&mut decode(30.0, 0)).aux);
    }

    #[test]
    fn test_sequence_range() {
        let checker = ValidationRangeChecker::default();
        let mut sample = decode(20.0, 127);
        assert!(checker.check(&mut sample).sequence);

        let mut sample = decode(20.0, 128);
        let validity = checker.check(&mut sample);
        assert!(!validity.sequence);
        assert!(validity.aux);
        assert_eq!(sample.validity, validity);
        assert_eq!(validity.invalid_count(), 1);
    }

    #[test]
    fn test_nan_and_status_bits() {
        let checker = ValidationRangeChecker::default();
        let mut sample = decode(f32::NAN, 0);
        sample.gyro[1] = f32::INFINITY;
        sample.status.accel_valid[2] = false;

        let validity = checker.check(&mut sample);
        assert!(!validity.aux);
        assert_eq!(validity.gyro, [true, false, true]);
        assert_eq!(validity.accel, [true, true, false]);
        assert!(!validity.all_valid());
        // Partial degradation: the rest of the sample stays usable
        assert!(sample.crc_valid);
    }
}
