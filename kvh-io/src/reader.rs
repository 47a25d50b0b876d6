//! Reader loop: transport → pipeline → sink
//!
//! Runs until the running flag is cleared, the transport reaches end of
//! stream, or an I/O error occurs. Read errors are not retried; the caller
//! decides whether to reopen the device.

use crate::error::Result;
use crate::pipeline::{DecodePipeline, PipelineEvent, ProcessedFrame};
use crate::protocol::SyncEvent;
use crate::sink::SampleSink;
use crate::stats::{LinkStats, StatsReporter};
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Reader loop settings
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Bytes requested per read
    pub read_chunk: usize,
    /// Interval between link statistics lines (zero disables)
    pub stats_interval: Duration,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            read_chunk: 256,
            stats_interval: Duration::from_secs(5),
        }
    }
}

/// One-line summary of a frame for the log
pub fn describe(frame: &ProcessedFrame) -> String {
    let s = &frame.sample;
    format!(
        "#{} seq={:3} gyro=[{:+.5} {:+.5} {:+.5}] rad/s accel=[{:+.4} {:+.4} {:+.4}] m/s² {}={:.3}{}{}",
        frame.index,
        s.sequence,
        s.gyro[0],
        s.gyro[1],
        s.gyro[2],
        s.accel_ms2[0],
        s.accel_ms2[1],
        s.accel_ms2[2],
        s.aux_slot().name(),
        s.temp_mag_raw,
        if s.crc_valid { "" } else { " CRC-FAIL" },
        match s.validity.invalid_count() {
            0 => String::new(),
            n => format!(" INVALID={}", n),
        },
    )
}

/// Pump bytes from `transport` through `pipeline` into `sink`
///
/// Returns the session counters when the loop stops.
pub fn run_stream<T, S>(
    transport: &mut T,
    pipeline: &mut DecodePipeline,
    sink: &mut S,
    options: ReaderOptions,
    running: &AtomicBool,
) -> Result<LinkStats>
where
    T: Transport + ?Sized,
    S: SampleSink + ?Sized,
{
    let mut buffer = vec![0u8; options.read_chunk.max(1)];
    let mut reporter = StatsReporter::new(options.stats_interval);
    let started = Instant::now();

    while running.load(Ordering::Relaxed) {
        let n = transport.read(&mut buffer)?;
        if n == 0 {
            if transport.at_end() {
                log::info!("End of stream");
                break;
            }
            // Serial reads already wait for the timeout; this covers sources that don't
            thread::sleep(Duration::from_millis(1));
            continue;
        }

        let mut sink_result = Ok(());
        pipeline.feed_with(&buffer[..n], |event| match event {
            PipelineEvent::Frame(frame) => {
                if frame.should_log() {
                    log::info!("{}", describe(&frame));
                }
                // Log suppression never suppresses delivery
                if sink_result.is_ok() {
                    if let Err(e) = sink.publish(&frame) {
                        sink_result = Err(e);
                    }
                }
            }
            PipelineEvent::Sync(SyncEvent::Resync {
                consecutive_failures,
            }) => {
                log::warn!(
                    "Lost frame sync after {} consecutive failures",
                    consecutive_failures
                );
            }
            PipelineEvent::Sync(SyncEvent::Synced { from }) => {
                log::info!("Frame sync established (was {:?})", from);
            }
        });
        sink_result?;

        pipeline.stats_mut().sink_dropped = sink.dropped();
        reporter.maybe_report(&pipeline.stats());
    }

    pipeline.finish();
    pipeline.stats_mut().sink_dropped = sink.dropped();
    let stats = pipeline.stats();
    reporter.report(&stats, started.elapsed());
    Ok(stats)
}
