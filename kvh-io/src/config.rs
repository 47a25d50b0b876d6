//! Configuration for kvh-io
//!
//! Loads configuration from a TOML file. Every section and field has a
//! default, so an empty file is a valid configuration.

use crate::change::ChangeThresholds;
use crate::error::{Error, Result};
use crate::pipeline::PipelineConfig;
use crate::protocol::constants::DEFAULT_RESYNC_THRESHOLD;
use crate::protocol::{ByteOrder, StatusLayout};
use crate::validation::ValidationRanges;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub decoder: DecoderConfig,
    pub sync: SyncConfig,
    pub change: ChangeThresholds,
    pub ranges: ValidationRanges,
    pub publish: PublishConfig,
    pub logging: LoggingConfig,
}

/// Serial device
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port path
    pub port: String,
    pub baud_rate: u32,
    /// Bytes requested per read
    pub read_chunk: usize,
    /// Serial read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Commands written to the device after opening, e.g. `=OUTPUTFMT,B`
    pub configure_commands: Vec<String>,
    /// Pause between configuration commands in milliseconds
    pub command_gap_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 921_600,
            read_chunk: 256,
            read_timeout_ms: 100,
            configure_commands: Vec::new(),
            command_gap_ms: 200,
        }
    }
}

/// Field decoding
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub byte_order: ByteOrder,
    pub status: StatusLayout,
}

/// Frame synchronisation
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Consecutive CRC or stride failures before resync
    pub resync_threshold: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            resync_threshold: DEFAULT_RESYNC_THRESHOLD,
        }
    }
}

/// Sample hand-off to consumers
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Bounded queue depth; samples are dropped when it is full
    pub queue_depth: usize,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { queue_depth: 256 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Seconds between link statistics lines, 0 disables them
    pub stats_interval_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            stats_interval_secs: 5,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use kvh_io::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("kvh.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.device.baud_rate == 0 {
            return Err(Error::Config("device.baud_rate must be > 0".into()));
        }
        if self.device.read_chunk == 0 {
            return Err(Error::Config("device.read_chunk must be > 0".into()));
        }
        if self.sync.resync_threshold == 0 {
            return Err(Error::Config("sync.resync_threshold must be > 0".into()));
        }
        if let Some(cmd) = self
            .device
            .configure_commands
            .iter()
            .find(|c| c.trim().is_empty() || c.contains(['\r', '\n']))
        {
            return Err(Error::Config(format!(
                "device.configure_commands entry {:?} must be one non-empty line",
                cmd
            )));
        }
        if self.publish.queue_depth == 0 {
            return Err(Error::Config("publish.queue_depth must be > 0".into()));
        }

        let thresholds = [
            ("gyro", self.change.gyro),
            ("accel", self.change.accel),
            ("temp_mag", self.change.temp_mag),
        ];
        for (name, value) in thresholds {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!(
                    "change.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        for (name, [lo, hi]) in [
            ("temperature", self.ranges.temperature),
            ("magnetic", self.ranges.magnetic),
        ] {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(Error::Config(format!(
                    "ranges.{} must be [min, max] with min <= max, got [{}, {}]",
                    name, lo, hi
                )));
            }
        }

        if let Some(bit) = self.decoder.status.bits().find(|&b| b > 7) {
            return Err(Error::Config(format!(
                "decoder.status bit index {} out of range 0..=7",
                bit
            )));
        }

        if log_level_filter(&self.logging.level).is_none() {
            return Err(Error::Config(format!(
                "logging.level '{}' is not a log level",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Settings for a decode session
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            byte_order: self.decoder.byte_order,
            status_layout: self.decoder.status,
            ranges: self.ranges,
            thresholds: self.change,
            resync_threshold: self.sync.resync_threshold,
        }
    }
}

/// Parse a level name the way `env_logger` filters do
pub fn log_level_filter(level: &str) -> Option<log::LevelFilter> {
    level.parse().ok()
}
