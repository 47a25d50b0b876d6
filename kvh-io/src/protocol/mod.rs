//! KVH 38-byte IMU frame protocol

pub mod constants;
pub mod crc;
pub mod frame;
pub mod ring_buffer;
pub mod sync;

pub use crc::{crc32_mpeg2, CrcValidator};
pub use frame::{
    ByteOrder, DecodedSample, FrameDecoder, FrameEncoder, FrameFields, RawFrame, StatusFlags,
    StatusLayout,
};
pub use sync::{FrameSync, SyncEvent, SyncState, SyncStats};
