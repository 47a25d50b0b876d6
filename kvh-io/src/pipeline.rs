//! Decode session: bytes in, validated samples out
//!
//! Every candidate frame goes through the same steps, in order:
//!
//! | Step | Component | Effect |
//! |---|---|---|
//! | 1 | [`FrameSync`] | locate header, cut 38-byte candidate |
//! | 2 | [`FrameDecoder`] | fields, status flags, CRC check |
//! | 3 | [`ValidationRangeChecker`] | per-field validity flags |
//! | 4 | [`InterleaveState`] | slot update, tagged with the CRC result |
//! | 5 | [`ChangeDetector`] | should-log decision, baseline update |
//!
//! A session owns all mutable state. Two sessions never share interleave
//! slots or change baselines.

use crate::change::{ChangeBaseline, ChangeDecision, ChangeDetector, ChangeThresholds};
use crate::interleave::{AuxSlot, AuxView, InterleaveState, SlotValue};
use crate::protocol::constants::DEFAULT_RESYNC_THRESHOLD;
use crate::protocol::sync::SYNC_BUFFER_SIZE;
use crate::protocol::{
    ByteOrder, DecodedSample, FrameDecoder, FrameSync, RawFrame, StatusLayout, SyncEvent,
    SyncState,
};
use crate::stats::LinkStats;
use crate::validation::{ValidationRangeChecker, ValidationRanges};

/// Settings for one decode session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub byte_order: ByteOrder,
    pub status_layout: StatusLayout,
    pub ranges: ValidationRanges,
    pub thresholds: ChangeThresholds,
    /// Consecutive failures before entering resync
    pub resync_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::default(),
            status_layout: StatusLayout::default(),
            ranges: ValidationRanges::default(),
            thresholds: ChangeThresholds::default(),
            resync_threshold: DEFAULT_RESYNC_THRESHOLD,
        }
    }
}

/// A fully processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedFrame {
    /// Position of the frame in the session, starting at 0
    pub index: u64,
    pub sample: DecodedSample,
    /// Slot written by this frame
    pub slot: AuxSlot,
    pub decision: ChangeDecision,
    /// Auxiliary block after this frame
    pub aux: AuxView,
    /// Sync state after this frame was reported
    pub state: SyncState,
}

impl ProcessedFrame {
    #[inline]
    pub fn should_log(&self) -> bool {
        self.decision.should_log
    }
}

/// Output of [`DecodePipeline::feed`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineEvent {
    Frame(ProcessedFrame),
    Sync(SyncEvent),
}

/// One decode session over one byte stream
pub struct DecodePipeline {
    sync: FrameSync,
    decoder: FrameDecoder,
    checker: ValidationRangeChecker,
    interleave: InterleaveState,
    detector: ChangeDetector,
    stats: LinkStats,
    frame_index: u64,
}

impl DecodePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            sync: FrameSync::new(config.resync_threshold),
            decoder: FrameDecoder::new(config.byte_order, config.status_layout),
            checker: ValidationRangeChecker::new(config.ranges),
            interleave: InterleaveState::new(),
            detector: ChangeDetector::new(config.thresholds),
            stats: LinkStats::default(),
            frame_index: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.sync.state()
    }

    /// Counters including the synchroniser's
    pub fn stats(&self) -> LinkStats {
        LinkStats {
            sync: *self.sync.stats(),
            ..self.stats
        }
    }

    /// Mutable counters, for layers above the pipeline (sink drops)
    pub fn stats_mut(&mut self) -> &mut LinkStats {
        &mut self.stats
    }

    pub fn interleave(&self) -> &InterleaveState {
        &self.interleave
    }

    pub fn baseline(&self) -> Option<&ChangeBaseline> {
        self.detector.baseline()
    }

    /// Process a chunk of bytes and collect the resulting events
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        self.feed_with(bytes, |e| events.push(e));
        events
    }

    /// Process a chunk of bytes, handing each event to `on_event` as it happens
    pub fn feed_with<F: FnMut(PipelineEvent)>(&mut self, bytes: &[u8], mut on_event: F) {
        // Keep each push within the scan buffer; draining in between leaves
        // less than one frame behind
        for chunk in bytes.chunks(SYNC_BUFFER_SIZE / 2) {
            self.sync.push(chunk);
            while let Some(candidate) = self.sync.next_candidate() {
                let processed = self.process(&candidate);
                while let Some(event) = self.sync.take_event() {
                    on_event(PipelineEvent::Sync(event));
                }
                if let Some(frame) = processed {
                    on_event(PipelineEvent::Frame(frame));
                }
            }
            while let Some(event) = self.sync.take_event() {
                on_event(PipelineEvent::Sync(event));
            }
        }
    }

    /// End of stream: report bytes left over that never formed a frame
    pub fn finish(&mut self) -> usize {
        let leftover = self.sync.pending();
        if leftover > 0 {
            log::debug!("End of stream with {} bytes of incomplete frame", leftover);
        }
        leftover
    }

    /// Start a fresh session on the same settings
    pub fn reset(&mut self) {
        self.sync.reset();
        self.interleave.clear();
        self.detector = ChangeDetector::new(*self.detector.thresholds());
        self.stats = LinkStats::default();
        self.frame_index = 0;
    }

    fn process(&mut self, candidate: &RawFrame) -> Option<ProcessedFrame> {
        let mut sample = match self.decoder.decode_frame(candidate) {
            Ok(sample) => sample,
            Err(e) => {
                log::debug!("Candidate rejected: {}", e);
                self.sync.report(false);
                return None;
            }
        };

        self.sync.report(sample.crc_valid);
        let index = self.frame_index;
        self.frame_index += 1;
        self.stats.frames += 1;

        let validity = self.checker.check(&mut sample);
        if !validity.all_valid() {
            self.stats.out_of_range += 1;
        }

        if !sample.crc_valid {
            self.stats.crc_failures += 1;
            log::debug!(
                "CRC mismatch on frame {} (seq {}, transmitted {:08X})",
                index,
                sample.sequence,
                sample.crc
            );
        }

        let slot = self.interleave.update(SlotValue {
            value: sample.temp_mag_raw,
            sequence: sample.sequence,
            frame_index: index,
            in_range: validity.aux,
            crc_valid: sample.crc_valid,
        });

        let decision = self.detector.observe(&sample);
        if decision.should_log {
            self.stats.logged += 1;
        }

        Some(ProcessedFrame {
            index,
            sample,
            slot,
            decision,
            aux: self.interleave.view(),
            state: self.sync.state(),
        })
    }
}

impl Default for DecodePipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
