//! Error handling for the biosignal bridge
//!
//! Every failure the pipeline can observe maps onto one variant here. The
//! streaming loop inspects the variant to decide which state transition to
//! take; nothing in the pipeline is retried.

use std::io;
use thiserror::Error;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error type for all bridge operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BridgeError {
    /// Device link could not be established
    #[error("Failed to connect to device {address}: {reason}")]
    ConnectFailed {
        /// Device address that was dialled
        address: String,
        /// Driver-provided description
        reason: String,
    },

    /// Device refused the acquisition parameters
    #[error("Device rejected acquisition start: {reason}")]
    DeviceRejected {
        /// Driver-provided description
        reason: String,
    },

    /// Device read failed mid-stream
    #[error("Device read failed: {reason}")]
    ReadFailed {
        /// Driver-provided description
        reason: String,
    },

    /// Device refused or failed to stop acquisition
    #[error("Device stop failed: {reason}")]
    StopFailed {
        /// Driver-provided description
        reason: String,
    },

    /// Writing to the downstream client failed (usually a disconnect)
    #[error("Client write failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// Listening socket could not be bound
    #[error("Failed to bind listener: {0}")]
    Bind(#[source] io::Error),

    /// Accepting the downstream connection failed
    #[error("Failed to accept client connection: {0}")]
    Accept(#[source] io::Error),

    /// A configured deadline elapsed
    #[error("Timed out waiting for {operation}")]
    Timeout {
        /// Operation that was waiting
        operation: &'static str,
    },

    /// External interrupt requested shutdown
    #[error("Interrupted by shutdown request")]
    Interrupted,

    /// Raw sample tuple has the wrong arity
    #[error("Malformed raw sample: expected {expected} fields, got {actual}")]
    MalformedSample {
        /// Required tuple width
        expected: usize,
        /// Width that was received
        actual: usize,
    },

    /// Packet could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A received line is not a valid metrics packet
    #[error("Protocol error on line {line}: {reason}")]
    Protocol {
        /// 1-based line number in the stream
        line: u64,
        /// Description of the problem
        reason: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Description of the configuration error
        reason: String,
    },

    /// `run` was called on a server that has already shut down
    #[error("Server is closed and cannot be run again")]
    AlreadyClosed,

    /// A release step failed during shutdown
    #[error("Cleanup step '{step}' failed: {reason}")]
    CleanupFailed {
        /// Name of the release step
        step: &'static str,
        /// Description of the failure
        reason: String,
    },
}

impl BridgeError {
    /// Errors that end a run before any client is served
    pub fn is_fatal_startup(&self) -> bool {
        matches!(
            self,
            BridgeError::ConnectFailed { .. }
                | BridgeError::DeviceRejected { .. }
                | BridgeError::Bind(_)
                | BridgeError::Config { .. }
        )
    }

    /// Shorthand for building a read failure from any displayable cause
    pub fn read_failed(reason: impl Into<String>) -> Self {
        BridgeError::ReadFailed {
            reason: reason.into(),
        }
    }

    /// Shorthand for building a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        BridgeError::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = BridgeError::MalformedSample {
            expected: 7,
            actual: 4,
        };
        let display = format!("{}", error);
        assert!(display.contains("Malformed raw sample"));
        assert!(display.contains('7'));
        assert!(display.contains('4'));
    }

    #[test]
    fn test_startup_classification() {
        let connect = BridgeError::ConnectFailed {
            address: "98:D3:51:FE:86:88".to_string(),
            reason: "no route".to_string(),
        };
        assert!(connect.is_fatal_startup());
        assert!(BridgeError::DeviceRejected { reason: "rate".into() }.is_fatal_startup());

        assert!(!BridgeError::read_failed("lost link").is_fatal_startup());
        assert!(!BridgeError::Interrupted.is_fatal_startup());
        assert!(!BridgeError::StopFailed { reason: "busy".into() }.is_fatal_startup());
    }

    #[test]
    fn test_write_failure_keeps_source() {
        use std::error::Error;

        let io = io::Error::new(io::ErrorKind::BrokenPipe, "peer gone");
        let error = BridgeError::WriteFailed(io);
        let source = error.source().unwrap();
        assert!(source.to_string().contains("peer gone"));
    }
}
