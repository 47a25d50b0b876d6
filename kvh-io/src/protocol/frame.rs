//! Frame layout, decoding and encoding
//!
//! Frame format (38 bytes):
//!
//! ```text
//! [0..4]   header FE 81 FF 57
//! [4..16]  gyro x, y, z      f32 rad/s
//! [16..28] accel x, y, z     f32 g
//! [28..32] temp/mag scalar   f32, slot chosen by sequence % 4
//! [32]     status flags
//! [33]     sequence 0..=127
//! [34..36] CRC high half     u16
//! [36..38] CRC low half      u16
//! ```
//!
//! The byte order of the multi-byte fields has not been confirmed against a
//! device capture, so [`FrameDecoder`] and [`FrameEncoder`] take a [`ByteOrder`].

use super::constants::*;
use super::crc::{crc32_mpeg2, CrcValidator};
use crate::error::{Error, Result};
use crate::interleave::AuxSlot;
use crate::validation::FieldValidity;
use serde::{Deserialize, Serialize};

/// Byte order of the multi-byte frame fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Network order, as in the vendor's earlier output formats
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    #[inline]
    fn read_f32(self, bytes: &[u8]) -> f32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::Big => f32::from_be_bytes(raw),
            ByteOrder::Little => f32::from_le_bytes(raw),
        }
    }

    #[inline]
    fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::Big => u16::from_be_bytes(raw),
            ByteOrder::Little => u16::from_le_bytes(raw),
        }
    }

    #[inline]
    fn write_f32(self, value: f32, out: &mut [u8]) {
        let raw = match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        };
        out[..4].copy_from_slice(&raw);
    }

    #[inline]
    fn write_u16(self, value: u16, out: &mut [u8]) {
        let raw = match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        };
        out[..2].copy_from_slice(&raw);
    }
}

/// Bit positions inside the status byte
///
/// Defaults follow the vendor's earlier formats (gyro 0-2, accel 4-6) with
/// temperature on bit 3 and magnetometer on bit 7. The flags are active low:
/// a clear bit means the sensor is healthy, so `0x00` is an all-valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLayout {
    pub gyro_valid_bits: [u8; 3],
    pub accel_valid_bits: [u8; 3],
    pub temperature_valid_bit: u8,
    pub magnetic_valid_bit: u8,
    /// A set bit marks the sensor invalid (false: a set bit marks it valid)
    pub invalid_when_set: bool,
}

impl Default for StatusLayout {
    fn default() -> Self {
        Self {
            gyro_valid_bits: DEFAULT_GYRO_VALID_BITS,
            accel_valid_bits: DEFAULT_ACCEL_VALID_BITS,
            temperature_valid_bit: DEFAULT_TEMPERATURE_VALID_BIT,
            magnetic_valid_bit: DEFAULT_MAGNETIC_VALID_BIT,
            invalid_when_set: true,
        }
    }
}

impl StatusLayout {
    /// Decode a raw status byte
    pub fn decode(&self, raw: u8) -> StatusFlags {
        let valid = |bit: u8| bit_set(raw, bit) != self.invalid_when_set;
        StatusFlags {
            raw,
            gyro_valid: self.gyro_valid_bits.map(valid),
            accel_valid: self.accel_valid_bits.map(valid),
            temperature_valid: valid(self.temperature_valid_bit),
            magnetic_valid: valid(self.magnetic_valid_bit),
        }
    }

    /// Raw status byte reporting every sensor healthy
    pub fn all_valid(&self) -> u8 {
        if self.invalid_when_set {
            0x00
        } else {
            self.bits().fold(0u8, |acc, b| acc | 1u8.checked_shl(b as u32).unwrap_or(0))
        }
    }

    /// All bit indices in the layout
    pub fn bits(&self) -> impl Iterator<Item = u8> + '_ {
        self.gyro_valid_bits
            .iter()
            .chain(self.accel_valid_bits.iter())
            .copied()
            .chain([self.temperature_valid_bit, self.magnetic_valid_bit])
    }
}

#[inline]
fn bit_set(raw: u8, bit: u8) -> bool {
    bit < 8 && raw & (1 << bit) != 0
}

/// Decoded status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags {
    pub raw: u8,
    pub gyro_valid: [bool; 3],
    pub accel_valid: [bool; 3],
    pub temperature_valid: bool,
    pub magnetic_valid: bool,
}

/// Exactly one frame worth of bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    /// Wrap a 38-byte array
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// True if the frame starts with the header constant
    #[inline]
    pub fn has_header(&self) -> bool {
        self.0[..HEADER_LEN] == HEADER
    }
}

impl TryFrom<&[u8]> for RawFrame {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; FRAME_LEN] = bytes.try_into().map_err(|_| Error::Format {
            expected: FRAME_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// One decoded frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedSample {
    /// Angular rate (rad/s)
    pub gyro: [f32; 3],
    /// Acceleration as transmitted (g)
    pub accel_g: [f32; 3],
    /// Acceleration derived from `accel_g` (m/s²)
    pub accel_ms2: [f32; 3],
    /// Interleaved temperature / magnetometer value
    pub temp_mag_raw: f32,
    /// Transmitted sequence counter
    pub sequence: u8,
    /// `sequence % 4`, selects the auxiliary slot
    pub sequence_mod4: u8,
    pub status: StatusFlags,
    /// Transmitted CRC (high half << 16 | low half)
    pub crc: u32,
    pub crc_valid: bool,
    /// Per-field validity, filled in by the range checker
    pub validity: FieldValidity,
}

impl DecodedSample {
    /// Auxiliary slot carried by this sample
    #[inline]
    pub fn aux_slot(&self) -> AuxSlot {
        AuxSlot::from_sequence(self.sequence)
    }
}

/// Convert g to m/s²
#[inline]
pub fn g_to_ms2(g: f32) -> f32 {
    (g as f64 * STANDARD_GRAVITY) as f32
}

/// Decodes raw frames into [`DecodedSample`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder {
    byte_order: ByteOrder,
    status_layout: StatusLayout,
}

impl FrameDecoder {
    pub fn new(byte_order: ByteOrder, status_layout: StatusLayout) -> Self {
        Self {
            byte_order,
            status_layout,
        }
    }

    /// Decode a frame buffer
    ///
    /// Fails with [`Error::Format`] unless `bytes` is exactly 38 bytes long and
    /// with [`Error::InvalidHeader`] if the header does not match. A CRC
    /// mismatch is not an error: the sample comes back with `crc_valid == false`.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedSample> {
        let frame = RawFrame::try_from(bytes)?;
        self.decode_frame(&frame)
    }

    /// Decode an already length-checked frame
    pub fn decode_frame(&self, frame: &RawFrame) -> Result<DecodedSample> {
        let b = frame.as_bytes();
        if !frame.has_header() {
            return Err(Error::InvalidHeader {
                found: [b[0], b[1], b[2], b[3]],
            });
        }

        let order = self.byte_order;
        let vec3 = |offset: usize| {
            [
                order.read_f32(&b[offset..]),
                order.read_f32(&b[offset + 4..]),
                order.read_f32(&b[offset + 8..]),
            ]
        };

        let gyro = vec3(OFFSET_GYRO);
        let accel_g = vec3(OFFSET_ACCEL);
        let temp_mag_raw = order.read_f32(&b[OFFSET_TEMP_MAG..]);
        let sequence = b[OFFSET_SEQUENCE];

        let crc_high = order.read_u16(&b[OFFSET_CRC_HIGH..]) as u32;
        let crc_low = order.read_u16(&b[OFFSET_CRC_LOW..]) as u32;
        let crc = (crc_high << 16) | crc_low;

        Ok(DecodedSample {
            gyro,
            accel_g,
            accel_ms2: accel_g.map(g_to_ms2),
            temp_mag_raw,
            sequence,
            sequence_mod4: sequence % AUX_SLOT_COUNT as u8,
            status: self.status_layout.decode(b[OFFSET_STATUS]),
            crc,
            crc_valid: CrcValidator::check_frame(b, crc),
            validity: FieldValidity::default(),
        })
    }
}

/// Field values for building a frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameFields {
    pub gyro: [f32; 3],
    pub accel_g: [f32; 3],
    pub temp_mag: f32,
    pub status: u8,
    pub sequence: u8,
}

/// Builds wire-exact frames (capture synthesis and tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEncoder {
    byte_order: ByteOrder,
}

impl FrameEncoder {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }

    /// Encode fields into a frame with a correct CRC
    pub fn encode(&self, fields: &FrameFields) -> RawFrame {
        let order = self.byte_order;
        let mut b = [0u8; FRAME_LEN];
        b[..HEADER_LEN].copy_from_slice(&HEADER);
        for (i, v) in fields.gyro.iter().enumerate() {
            order.write_f32(*v, &mut b[OFFSET_GYRO + 4 * i..]);
        }
        for (i, v) in fields.accel_g.iter().enumerate() {
            order.write_f32(*v, &mut b[OFFSET_ACCEL + 4 * i..]);
        }
        order.write_f32(fields.temp_mag, &mut b[OFFSET_TEMP_MAG..]);
        b[OFFSET_STATUS] = fields.status;
        b[OFFSET_SEQUENCE] = fields.sequence;

        let crc = crc32_mpeg2(&b[CRC_REGION_START..CRC_REGION_END]);
        order.write_u16((crc >> 16) as u16, &mut b[OFFSET_CRC_HIGH..]);
        order.write_u16((crc & 0xFFFF) as u16, &mut b[OFFSET_CRC_LOW..]);
        RawFrame::new(b)
    }
}
