//! CRC-32/MPEG-2 frame integrity check
//!
//! Parameters: poly 0x04C11DB7, init 0xFFFFFFFF, no input/output reflection,
//! no final XOR. Check value for `"123456789"` is 0x0376E6E7.

use super::constants::{CRC_REGION_END, CRC_REGION_START, FRAME_LEN};

const POLY: u32 = 0x04C1_1DB7;
const INIT: u32 = 0xFFFF_FFFF;

/// Byte-wise lookup table, built at compile time
const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute CRC-32/MPEG-2 over `data`
#[inline]
pub fn crc32_mpeg2(data: &[u8]) -> u32 {
    data.iter().fold(INIT, |crc, &b| {
        (crc << 8) ^ TABLE[((crc >> 24) as u8 ^ b) as usize]
    })
}

/// Checks the transmitted CRC of a frame against its payload region.
///
/// Never fails and never discards: a mismatch is reported as `false` so the
/// frame can still be forwarded and counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrcValidator;

impl CrcValidator {
    /// Compare the CRC of `region` with `transmitted`
    #[inline]
    pub fn check(region: &[u8], transmitted: u32) -> bool {
        crc32_mpeg2(region) == transmitted
    }

    /// Validate a full frame buffer using the transmitted value already decoded from it
    #[inline]
    pub fn check_frame(frame: &[u8; FRAME_LEN], transmitted: u32) -> bool {
        Self::check(&frame[CRC_REGION_START..CRC_REGION_END], transmitted)
    }
}
