//! kvh-io - IMU stream decoder daemon
//!
//! Reads the 38-byte frame stream from a serial port (or a recorded capture),
//! logs significant samples and link statistics, and hands samples to a
//! consumer thread over a bounded channel.

use clap::Parser;
use kvh_io::config::AppConfig;
use kvh_io::device;
use kvh_io::error::{Error, Result};
use kvh_io::reader::{run_stream, ReaderOptions};
use kvh_io::sink::ChannelSink;
use kvh_io::transport::{SerialTransport, StreamTransport, Transport};
use kvh_io::DecodePipeline;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kvh-io")]
#[command(about = "Decode and validate a KVH-style 38-byte IMU frame stream")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port (overrides device.port)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides device.baud_rate)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Replay a raw capture file instead of the serial port ("-" for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(port) = &args.port {
        config.device.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.device.baud_rate = baud;
    }
    config.validate()?;
    Ok(config)
}

fn open_transport(args: &Args, config: &AppConfig) -> Result<Box<dyn Transport>> {
    match &args.input {
        Some(path) if path.as_os_str() == "-" => {
            log::info!("Reading capture from stdin");
            Ok(Box::new(StreamTransport::new(std::io::stdin())))
        }
        Some(path) => Ok(Box::new(StreamTransport::open(path)?)),
        None => {
            let mut serial = SerialTransport::open(
                &config.device.port,
                config.device.baud_rate,
                Duration::from_millis(config.device.read_timeout_ms),
            )?;
            if !config.device.configure_commands.is_empty() {
                device::send_commands(
                    &mut serial,
                    &config.device.configure_commands,
                    Duration::from_millis(config.device.command_gap_ms),
                )?;
                // Command replies are text, not frames
                serial.clear_input()?;
            }
            Ok(Box::new(serial))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("kvh-io v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        log::info!("Using config: {}", path.display());
    }
    log::info!(
        "Byte order: {:?}, resync after {} failures",
        config.decoder.byte_order,
        config.sync.resync_threshold
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let mut transport = open_transport(&args, &config)?;
    let (mut sink, rx) = ChannelSink::new(config.publish.queue_depth);

    // Downstream consumers attach here; for now samples are only traced
    let consumer = thread::Builder::new()
        .name("kvh-consumer".into())
        .spawn(move || {
            let mut received = 0u64;
            for frame in rx.iter() {
                received += 1;
                log::trace!(
                    "Consumed frame #{} (seq {}, temperature {:?}, slot ages {:?})",
                    frame.index,
                    frame.sample.sequence,
                    frame.aux.trusted().temperature_c(),
                    frame.aux.ages(frame.index)
                );
            }
            log::debug!("Consumer exiting after {} frames", received);
        })?;

    let mut pipeline = DecodePipeline::new(config.pipeline());
    let options = ReaderOptions {
        read_chunk: config.device.read_chunk,
        stats_interval: Duration::from_secs(config.logging.stats_interval_secs),
    };

    let result = run_stream(&mut transport, &mut pipeline, &mut sink, options, &running);

    drop(sink);
    if consumer.join().is_err() {
        log::error!("Consumer thread panicked");
    }

    let stats = result?;
    log::info!(
        "Stopped: {} frames, {} CRC failures, {} resyncs, {} logged",
        stats.frames,
        stats.crc_failures,
        stats.sync.resyncs,
        stats.logged
    );
    Ok(())
}
