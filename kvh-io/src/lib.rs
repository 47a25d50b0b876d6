//! kvh-io - Frame recovery and validation for KVH-style binary IMU streams
//!
//! The IMU emits fixed 38-byte frames over a serial link. This library
//! recovers frame boundaries from the raw byte stream, checks integrity,
//! decodes the inertial fields, demultiplexes the interleaved
//! temperature/magnetometer channel and decides which samples are worth logging.
//!
//! ## Layout
//!
//! - [`protocol`]: wire format, CRC-32/MPEG-2, frame synchronisation
//! - [`validation`], [`interleave`], [`change`]: per-sample processing stages
//! - [`pipeline`]: one decode session wiring the stages together
//! - [`transport`], [`sink`], [`reader`]: byte sources, consumers, the run loop
//! - [`device`]: ASCII configuration commands sent before streaming

pub mod change;
pub mod config;
pub mod device;
pub mod error;
pub mod interleave;
pub mod pipeline;
pub mod protocol;
pub mod reader;
pub mod sink;
pub mod stats;
pub mod transport;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use pipeline::{DecodePipeline, PipelineConfig, PipelineEvent, ProcessedFrame};
pub use protocol::{DecodedSample, FrameDecoder, FrameSync, SyncState};
