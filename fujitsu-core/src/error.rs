//! Error types for the Fujitsu climate controller

use thiserror::Error;

/// Core error type for Fujitsu climate operations
#[derive(Error, Debug)]
pub enum FujitsuError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A field could not be packed into a frame. Never transmitted.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Framing or checksum failure, recovered by resynchronization
    #[error("Invalid frame: {0}")]
    DecodeInvalid(String),

    /// Checksum-valid frame carrying an opcode this controller does not know
    #[error("Unrecognized frame opcode 0x{opcode:02X}")]
    UnrecognizedFrame { opcode: u8 },

    /// Transport failure while writing to the bus
    #[error("Link error: {0}")]
    Link(String),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// The unit did not confirm a command after all retries
    #[error("Command not confirmed after {attempts} attempts")]
    CommandTimeout { attempts: u32 },

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Serial adapter not found
    #[error("Device not found")]
    DeviceNotFound,

    /// Serial adapter disconnected (USB unplugged, power cycle)
    #[error("Device disconnected: {0}")]
    DeviceDisconnected(String),

    /// Reopening the serial adapter failed after all attempts
    #[error("Reconnection failed after {attempts} attempts: {reason}")]
    ReconnectionFailed { attempts: u32, reason: String },
}

/// Result type alias for Fujitsu climate operations
pub type Result<T> = std::result::Result<T, FujitsuError>;

impl FujitsuError {
    /// Whether this error is a recoverable warning rather than a hard fault
    ///
    /// Timeouts and decode problems leave the controller running on stale
    /// state; they are never fatal to the process.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FujitsuError::CommandTimeout { .. }
                | FujitsuError::DecodeInvalid(_)
                | FujitsuError::UnrecognizedFrame { .. }
                | FujitsuError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for FujitsuError {
    fn from(err: serde_json::Error) -> Self {
        FujitsuError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for FujitsuError {
    fn from(err: toml::de::Error) -> Self {
        FujitsuError::Config(err.to_string())
    }
}
