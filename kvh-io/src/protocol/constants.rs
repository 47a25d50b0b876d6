//! Constants for the KVH binary output format (38-byte frame)
//!
//! Offsets are 0-based byte indices into a frame.

// Header
pub const HEADER: [u8; 4] = [0xFE, 0x81, 0xFF, 0x57];
pub const HEADER_LEN: usize = 4;

// Frame size
pub const FRAME_LEN: usize = 38;

// Field offsets
pub const OFFSET_GYRO: usize = 4; // x, y, z f32
pub const OFFSET_ACCEL: usize = 16; // x, y, z f32 (g)
pub const OFFSET_TEMP_MAG: usize = 28; // interleaved f32
pub const OFFSET_STATUS: usize = 32;
pub const OFFSET_SEQUENCE: usize = 33;
pub const OFFSET_CRC_HIGH: usize = 34;
pub const OFFSET_CRC_LOW: usize = 36;

// CRC coverage: everything between header and CRC (30 bytes)
pub const CRC_REGION_START: usize = OFFSET_GYRO;
pub const CRC_REGION_END: usize = OFFSET_CRC_HIGH;

// Sequence counter wraps at 128
pub const SEQUENCE_MAX: u8 = 127;

// Interleaved auxiliary slots
pub const AUX_SLOT_COUNT: usize = 4;

/// Standard gravity (m/s²) used for g → m/s² conversion
pub const STANDARD_GRAVITY: f64 = 9.80665;

// Default status bit positions (unconfirmed against device captures)
pub const DEFAULT_GYRO_VALID_BITS: [u8; 3] = [0, 1, 2];
pub const DEFAULT_TEMPERATURE_VALID_BIT: u8 = 3;
pub const DEFAULT_ACCEL_VALID_BITS: [u8; 3] = [4, 5, 6];
pub const DEFAULT_MAGNETIC_VALID_BIT: u8 = 7;

// Sync defaults
pub const DEFAULT_RESYNC_THRESHOLD: u32 = 8;
pub const DEFAULT_MAX_BUFFER: usize = 4096;
