//! Frame synchronisation over a continuous byte stream
//!
//! Bytes arrive in arbitrary chunks. The synchroniser looks for the 4-byte
//! header and hands out 38-byte candidate windows; the caller decides whether
//! a candidate was good (CRC) and reports back.
//!
//! # Scan rule
//!
//! After a candidate is handed out, scanning resumes one byte past the start
//! of its header, not past the whole frame. If the header was a false match
//! inside a bit-slipped payload, the real header that follows is still found.
//!
//! # State machine
//!
//! ```text
//! Init ──accepted──▶ Synced ──N consecutive failures──▶ Resync
//!                      ▲                                  │
//!                      └────────────accepted──────────────┘
//! ```
//!
//! Failures are CRC rejections reported by the caller and headers that do not
//! appear at the expected 38-byte stride. Entering `Resync` flushes the bytes
//! already scanned (the rest of a rejected window, or everything up to the
//! next header after a stride miss), drops the stride anchor and the failure
//! count, and rescans what follows one byte at a time. Stride is not enforced
//! again until a candidate is accepted.

use super::constants::{DEFAULT_MAX_BUFFER, DEFAULT_RESYNC_THRESHOLD, FRAME_LEN, HEADER, HEADER_LEN};
use super::frame::RawFrame;
use super::ring_buffer::RingBuffer;
use std::collections::VecDeque;

/// Scan buffer capacity
pub const SYNC_BUFFER_SIZE: usize = DEFAULT_MAX_BUFFER;

/// Synchronisation state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No frame accepted yet
    #[default]
    Init,
    /// Frames arriving on stride and passing CRC
    Synced,
    /// Link degraded, hunting byte by byte
    Resync,
}

/// State transitions worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// Threshold of consecutive failures reached
    Resync { consecutive_failures: u32 },
    /// A candidate was accepted after `Init` or `Resync`
    Synced { from: SyncState },
}

/// Byte and candidate counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStats {
    pub bytes_received: u64,
    /// Bytes skipped while hunting for a header, flushed on resync or dropped on overflow
    pub bytes_discarded: u64,
    pub candidates: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Headers not found at the expected stride
    pub sync_misses: u64,
    pub resyncs: u64,
}

/// Incremental frame synchroniser
pub struct FrameSync {
    buffer: RingBuffer<SYNC_BUFFER_SIZE>,
    state: SyncState,
    threshold: u32,
    consecutive_failures: u32,
    /// Logical offset where the next header should start, if anchored
    expected_header: Option<usize>,
    /// Leading bytes that belong to the last emitted candidate
    covered: usize,
    events: VecDeque<SyncEvent>,
    stats: SyncStats,
}

impl FrameSync {
    /// Create a synchroniser that resyncs after `threshold` consecutive failures
    pub fn new(threshold: u32) -> Self {
        Self {
            buffer: RingBuffer::new(),
            state: SyncState::Init,
            threshold: threshold.max(1),
            consecutive_failures: 0,
            expected_header: None,
            covered: 0,
            events: VecDeque::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Bytes retained for the next call
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Append received bytes
    ///
    /// If the chunk does not fit, the oldest buffered bytes are dropped to make room.
    pub fn push(&mut self, bytes: &[u8]) {
        self.stats.bytes_received += bytes.len() as u64;

        let bytes = if bytes.len() > SYNC_BUFFER_SIZE {
            let skipped = bytes.len() - SYNC_BUFFER_SIZE;
            self.stats.bytes_discarded += skipped as u64;
            &bytes[skipped..]
        } else {
            bytes
        };

        let shortfall = bytes.len().saturating_sub(self.buffer.free());
        if shortfall > 0 {
            log::warn!("Sync buffer overflow, dropping {} oldest bytes", shortfall);
            self.discard(shortfall);
        }
        self.buffer.extend(bytes);
    }

    /// Next candidate frame, if a header and 38 bytes are available
    ///
    /// Returns `None` when more input is needed. Every candidate must be
    /// followed by [`FrameSync::report`].
    pub fn next_candidate(&mut self) -> Option<RawFrame> {
        let Some(idx) = self.buffer.find_pattern(&HEADER, 0) else {
            if let Some(expected) = self.expected_header {
                if self.buffer.len() >= expected + HEADER_LEN {
                    self.stride_miss();
                }
            }
            // Keep a possible partial header at the tail
            let keep = HEADER_LEN - 1;
            if self.buffer.len() > keep {
                self.discard(self.buffer.len() - keep);
            }
            return None;
        };

        if let Some(expected) = self.expected_header {
            if idx > expected {
                self.stride_miss();
            }
        }
        if idx > 0 {
            self.discard(idx);
        }

        if self.buffer.len() < FRAME_LEN {
            return None;
        }

        let mut bytes = [0u8; FRAME_LEN];
        if !self.buffer.copy_out(0, &mut bytes) {
            return None;
        }

        self.buffer.advance(1);
        self.covered = FRAME_LEN - 1;
        self.expected_header = if self.state == SyncState::Resync {
            None
        } else {
            Some(FRAME_LEN - 1)
        };
        self.stats.candidates += 1;
        Some(RawFrame::new(bytes))
    }

    /// Report whether the last candidate passed validation
    pub fn report(&mut self, accepted: bool) {
        if accepted {
            self.stats.accepted += 1;
            self.consecutive_failures = 0;
            if self.state != SyncState::Synced {
                let from = self.state;
                self.state = SyncState::Synced;
                self.expected_header = Some(FRAME_LEN - 1);
                log::debug!("Frame sync acquired ({:?} -> Synced)", from);
                self.events.push_back(SyncEvent::Synced { from });
            }
        } else {
            self.stats.rejected += 1;
            if self.failure() {
                self.flush_scanned();
            }
        }
    }

    /// Pop the oldest unreported state transition
    pub fn take_event(&mut self) -> Option<SyncEvent> {
        self.events.pop_front()
    }

    /// Forget buffered bytes, state and counters (new session)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.stats = SyncStats::default();
        self.state = SyncState::Init;
        self.consecutive_failures = 0;
        self.expected_header = None;
        self.covered = 0;
        self.events.clear();
    }

    fn stride_miss(&mut self) {
        self.expected_header = None;
        if self.state == SyncState::Resync {
            return;
        }
        self.stats.sync_misses += 1;
        log::debug!("Header not found at expected stride");
        // The scan that follows discards up to the next header
        self.failure();
    }

    /// Count a failure; true if it tipped the state into `Resync`
    fn failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        if self.state != SyncState::Resync && self.consecutive_failures >= self.threshold {
            let consecutive_failures = self.consecutive_failures;
            log::debug!(
                "{} consecutive frame failures, resynchronising",
                consecutive_failures
            );
            self.state = SyncState::Resync;
            self.consecutive_failures = 0;
            self.expected_header = None;
            self.stats.resyncs += 1;
            self.events.push_back(SyncEvent::Resync {
                consecutive_failures,
            });
            return true;
        }
        false
    }

    /// Drop what is left of the rejected window
    fn flush_scanned(&mut self) {
        let n = self.covered.min(self.buffer.len());
        self.buffer.advance(n);
        self.covered = 0;
        self.stats.bytes_discarded += n as u64;
    }

    fn discard(&mut self, n: usize) {
        let n = n.min(self.buffer.len());
        self.buffer.advance(n);
        let consumed = n.min(self.covered);
        self.covered -= consumed;
        self.stats.bytes_discarded += (n - consumed) as u64;
        self.expected_header = self.expected_header.and_then(|e| e.checked_sub(n));
    }
}

impl Default for FrameSync {
    fn default() -> Self {
        Self::new(DEFAULT_RESYNC_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{FrameDecoder, FrameEncoder, FrameFields};

    fn frame(sequence: u8) -> RawFrame {
        FrameEncoder::default().encode(&FrameFields {
            gyro: [0.01, 0.02, 0.03],
            accel_g: [0.0, 0.0, 1.0],
            temp_mag: 21.0,
            status: 0x00,
            sequence,
        })
    }

    /// Drain candidates, reporting CRC results like the pipeline does
    fn drain(sync: &mut FrameSync) -> Vec<RawFrame> {
        let mut out = Vec::new();
        while let Some(candidate) = sync.next_candidate() {
            let ok = FrameDecoder::default()
                .decode_frame(&candidate)
                .map(|s| s.crc_valid)
                .unwrap_or(false);
            sync.report(ok);
            if ok {
                out.push(candidate);
            }
        }
        out
    }

    #[test]
    fn test_partial_frame_waits() {
        let mut sync = FrameSync::default();
        let f = frame(1);
        sync.push(&f.as_bytes()[..20]);
        assert!(sync.next_candidate().is_none());
        assert_eq!(sync.pending(), 20);

        sync.push(&f.as_bytes()[20..]);
        assert_eq!(drain(&mut sync), vec![f]);
        assert_eq!(sync.state(), SyncState::Synced);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut sync = FrameSync::default();
        let mut got = Vec::new();
        for seq in 0..3 {
            for &b in frame(seq).as_bytes() {
                sync.push(&[b]);
                got.extend(drain(&mut sync));
            }
        }
        assert_eq!(got, vec![frame(0), frame(1), frame(2)]);
        assert_eq!(sync.stats().sync_misses, 0);
    }

    #[test]
    fn test_noise_before_frame() {
        let mut sync = FrameSync::default();
        let noise: Vec<u8> = (0..50u8).map(|i| i.wrapping_mul(31).wrapping_add(7)).collect();
        sync.push(&noise);
        sync.push(frame(5).as_bytes());
        assert_eq!(drain(&mut sync), vec![frame(5)]);
        assert_eq!(sync.stats().candidates, 1);
        // Tail of the emitted frame is consumed, not discarded
        assert_eq!(sync.stats().bytes_discarded, 50);
    }

    #[test]
    fn test_trailing_partial_header_retained() {
        let mut sync = FrameSync::default();
        sync.push(&[0x00, 0x11, 0x22, 0xFE, 0x81]);
        assert!(sync.next_candidate().is_none());
        assert_eq!(sync.pending(), 3);
        sync.push(&frame(9).as_bytes()[2..]);
        assert_eq!(drain(&mut sync), vec![frame(9)]);
    }

    #[test]
    fn test_false_header_in_payload_recovers() {
        // A corrupted frame whose payload contains a header, followed by a good frame
        let mut bad = *frame(0).as_bytes();
        bad[10..14].copy_from_slice(&HEADER);
        let good = frame(1);

        let mut sync = FrameSync::default();
        sync.push(&bad);
        sync.push(good.as_bytes());
        assert_eq!(drain(&mut sync), vec![good]);
        assert!(sync.stats().rejected >= 1);
    }

    #[test]
    fn test_resync_after_threshold() {
        let mut sync = FrameSync::new(3);
        sync.push(frame(0).as_bytes());
        drain(&mut sync);
        assert_eq!(sync.take_event(), Some(SyncEvent::Synced { from: SyncState::Init }));

        // Three frames with broken CRCs, back to back
        for seq in 1..4 {
            let mut bad = *frame(seq).as_bytes();
            bad[20] ^= 0xFF;
            sync.push(&bad);
        }
        drain(&mut sync);
        assert_eq!(sync.state(), SyncState::Resync);
        assert_eq!(
            sync.take_event(),
            Some(SyncEvent::Resync {
                consecutive_failures: 3
            })
        );
        assert_eq!(sync.stats().resyncs, 1);

        // First good frame returns to Synced
        sync.push(frame(4).as_bytes());
        assert_eq!(drain(&mut sync), vec![frame(4)]);
        assert_eq!(sync.state(), SyncState::Synced);
        assert_eq!(sync.take_event(), Some(SyncEvent::Synced { from: SyncState::Resync }));
    }

    #[test]
    fn test_stride_miss_counts_as_failure() {
        let mut sync = FrameSync::new(2);
        sync.push(frame(0).as_bytes());
        drain(&mut sync);

        // Garbage where the next header should be, then a good frame
        sync.push(&[0u8; 5]);
        sync.push(frame(1).as_bytes());
        assert_eq!(drain(&mut sync), vec![frame(1)]);
        assert_eq!(sync.stats().sync_misses, 1);
        assert_eq!(sync.consecutive_failures, 0);
        assert_eq!(sync.state(), SyncState::Synced);
    }

    #[test]
    fn test_oversized_push_keeps_tail() {
        let mut sync = FrameSync::default();
        let mut big = vec![0u8; SYNC_BUFFER_SIZE * 2];
        let f = frame(3);
        let start = big.len() - FRAME_LEN;
        big[start..].copy_from_slice(f.as_bytes());
        sync.push(&big);
        assert_eq!(drain(&mut sync), vec![f]);
        assert_eq!(sync.stats().bytes_received, (SYNC_BUFFER_SIZE * 2) as u64);
    }

    #[test]
    fn test_resync_flushes_rejected_window() {
        let mut sync = FrameSync::new(2);
        sync.push(frame(0).as_bytes());
        drain(&mut sync);
        sync.take_event();

        for seq in 1..3 {
            let mut bad = *frame(seq).as_bytes();
            bad[20] ^= 0xFF;
            sync.push(&bad);
        }
        let next = frame(3);
        sync.push(&next.as_bytes()[..10]);
        let discarded_before = sync.stats().bytes_discarded;

        // First rejection keeps the window for rescanning
        let first = sync.next_candidate().unwrap();
        sync.report(false);
        assert_eq!(sync.state(), SyncState::Synced);
        assert_eq!(sync.pending(), 2 * FRAME_LEN + 10 - 1);
        assert!(sync.take_event().is_none());
        assert_ne!(first, frame(1));

        // Second one trips the threshold: the rest of its window goes
        sync.next_candidate().unwrap();
        sync.report(false);
        assert_eq!(
            sync.take_event(),
            Some(SyncEvent::Resync {
                consecutive_failures: 2
            })
        );
        assert_eq!(sync.pending(), 10);
        assert_eq!(sync.stats().bytes_discarded, discarded_before + (FRAME_LEN - 1) as u64);

        // Only the bytes that arrived after the window remain, and they still form a frame
        sync.push(&next.as_bytes()[10..]);
        assert_eq!(drain(&mut sync), vec![next]);
        assert_eq!(sync.state(), SyncState::Synced);
    }
}
