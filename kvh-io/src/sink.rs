//! Hand-off of processed frames to consumers
//!
//! The decode loop must never block on a slow consumer, so the channel sink
//! drops samples when its queue is full and counts them.

use crate::error::{Error, Result};
use crate::pipeline::ProcessedFrame;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Receiver side of a [`ChannelSink`]
pub type SampleReceiver = Receiver<ProcessedFrame>;

/// Destination for processed frames
pub trait SampleSink: Send {
    /// Offer a frame; returns `Ok(false)` if it was dropped
    fn publish(&mut self, frame: &ProcessedFrame) -> Result<bool>;

    /// Frames dropped so far
    fn dropped(&self) -> u64 {
        0
    }
}

/// Bounded crossbeam channel sink
pub struct ChannelSink {
    tx: Sender<ProcessedFrame>,
    dropped: u64,
}

impl ChannelSink {
    /// Create a sink and its receiver with room for `depth` frames
    pub fn new(depth: usize) -> (Self, SampleReceiver) {
        let (tx, rx) = bounded(depth.max(1));
        (Self { tx, dropped: 0 }, rx)
    }
}

impl SampleSink for ChannelSink {
    fn publish(&mut self, frame: &ProcessedFrame) -> Result<bool> {
        match self.tx.try_send(*frame) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped.is_power_of_two() {
                    log::warn!("Sample queue full, {} frames dropped so far", self.dropped);
                }
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(Error::SinkClosed),
        }
    }

    fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Discards everything (decode-only runs)
#[derive(Debug, Default)]
pub struct NullSink;

impl SampleSink for NullSink {
    fn publish(&mut self, _frame: &ProcessedFrame) -> Result<bool> {
        Ok(true)
    }
}
