//! Error types for DishaRover

use std::path::PathBuf;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DishaRover error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// GPIO or PWM setup failed (fatal at startup)
    #[error("Hardware initialization failed: {0}")]
    HardwareInit(String),

    /// Echo line never went high after the trigger pulse
    #[error("Timeout waiting for rising edge ({timeout_ms} ms)")]
    RisingEdgeTimeout { timeout_ms: u64 },

    /// Echo line went high but never came back low
    #[error("Timeout waiting for falling edge ({timeout_ms} ms)")]
    FallingEdgeTimeout { timeout_ms: u64 },

    /// Sensor log could not be opened (fatal at startup)
    #[error("Failed to open sensor log {path:?}: {source}")]
    LogFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sensor log line that is not a distance, marker or heading
    #[error("Malformed sensor log line {line}: {content:?}")]
    LogFormat { line: usize, content: String },

    /// GPIO operation failed after initialization
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the navigation loop may drop this iteration and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::RisingEdgeTimeout { .. } | Error::FallingEdgeTimeout { .. } | Error::Gpio(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranging_timeouts_are_recoverable() {
        assert!(Error::RisingEdgeTimeout { timeout_ms: 100 }.is_recoverable());
        assert!(Error::FallingEdgeTimeout { timeout_ms: 100 }.is_recoverable());
        assert!(Error::Gpio("read failed".to_string()).is_recoverable());
    }

    #[test]
    fn test_startup_errors_are_fatal() {
        assert!(!Error::HardwareInit("pwm".to_string()).is_recoverable());
        let open = Error::LogFileOpen {
            path: PathBuf::from("/nope/sensor_data.csv"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!open.is_recoverable());
        assert!(!Error::Config("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_timeout_messages_name_the_edge() {
        let rising = Error::RisingEdgeTimeout { timeout_ms: 100 }.to_string();
        let falling = Error::FallingEdgeTimeout { timeout_ms: 100 }.to_string();
        assert!(rising.contains("rising"));
        assert!(falling.contains("falling"));
    }
}
