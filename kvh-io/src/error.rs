//! Error types for kvh-io

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// kvh-io error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame buffer handed to the decoder has the wrong length
    #[error("Format error: expected {expected} bytes, got {actual}")]
    Format {
        /// Required frame length
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// Frame does not start with the expected header
    #[error("Invalid header: {found:02X?}")]
    InvalidHeader {
        /// First four bytes of the rejected buffer
        found: [u8; 4],
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Publish sink has no receiver left
    #[error("Sample sink closed")]
    SinkClosed,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
