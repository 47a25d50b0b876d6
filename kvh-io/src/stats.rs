//! Link quality counters and periodic reporting

use crate::protocol::SyncStats;
use std::time::{Duration, Instant};

/// Counters for one decode session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    /// Byte-level and synchronisation counters
    pub sync: SyncStats,
    /// Candidate frames decoded (CRC pass or fail)
    pub frames: u64,
    pub crc_failures: u64,
    /// Frames with at least one field flagged out of range
    pub out_of_range: u64,
    /// Frames judged significant by change detection
    pub logged: u64,
    /// Samples the sink could not take
    pub sink_dropped: u64,
}

impl LinkStats {
    /// Fraction of decoded frames that passed CRC (1.0 before any frame)
    pub fn success_rate(&self) -> f32 {
        if self.frames == 0 {
            return 1.0;
        }
        (self.frames - self.crc_failures) as f32 / self.frames as f32
    }
}

/// Logs frame rate and link quality at a fixed interval
pub struct StatsReporter {
    interval: Duration,
    last_report: Instant,
    last: LinkStats,
}

impl StatsReporter {
    /// A zero interval disables reporting
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: Instant::now(),
            last: LinkStats::default(),
        }
    }

    /// Log a summary if the interval has elapsed; returns true if it did
    pub fn maybe_report(&mut self, stats: &LinkStats) -> bool {
        if self.interval.is_zero() {
            return false;
        }
        let elapsed = self.last_report.elapsed();
        if elapsed < self.interval {
            return false;
        }
        self.report(stats, elapsed);
        true
    }

    /// Log a summary now
    pub fn report(&mut self, stats: &LinkStats, elapsed: Duration) {
        let secs = elapsed.as_secs_f64().max(f64::EPSILON);
        let frames = stats.frames.saturating_sub(self.last.frames);
        let failures = stats.crc_failures.saturating_sub(self.last.crc_failures);
        let bytes = stats
            .sync
            .bytes_received
            .saturating_sub(self.last.sync.bytes_received);

        log::info!(
            "Link: {:.1} frames/s, {:.1} KB/s, {} CRC failures, {} resyncs total, {} bytes discarded, success {:.1}%",
            frames as f64 / secs,
            bytes as f64 / secs / 1024.0,
            failures,
            stats.sync.resyncs,
            stats.sync.bytes_discarded,
            stats.success_rate() * 100.0
        );
        if stats.sink_dropped > self.last.sink_dropped {
            log::warn!(
                "Sink dropped {} samples since last report",
                stats.sink_dropped - self.last.sink_dropped
            );
        }

        self.last = *stats;
        self.last_report = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut stats = LinkStats::default();
        assert_eq!(stats.success_rate(), 1.0);
        stats.frames = 10;
        stats.crc_failures = 2;
        assert!((stats.success_rate() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_reporter_interval() {
        let stats = LinkStats::default();
        let mut disabled = StatsReporter::new(Duration::ZERO);
        assert!(!disabled.maybe_report(&stats));

        let mut reporter = StatsReporter::new(Duration::from_secs(3600));
        assert!(!reporter.maybe_report(&stats));

        let mut immediate = StatsReporter::new(Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(1));
        assert!(immediate.maybe_report(&stats));
    }
}
