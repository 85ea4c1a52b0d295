//! Error handling for GrblStream
//!
//! Provides the error taxonomy shared by every layer:
//! - Controller errors (streaming preconditions, readiness)
//! - Connection errors (transport open/send failures)
//! - Firmware errors (device response interpretation)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Controller error type
///
/// Precondition failures raised by the streaming controller. None of these
/// mutate controller state, so the caller may retry once the condition clears.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// Streaming was requested while commands are still in flight
    #[error(
        "Cannot begin streaming until there are no outstanding commands \
         ({outgoing} outgoing, {awaiting} awaiting response)"
    )]
    OutstandingCommands {
        /// Commands handed to the transport but not yet confirmed as sent.
        outgoing: usize,
        /// Commands confirmed as sent but not yet acknowledged.
        awaiting: usize,
    },

    /// The device has not reported its boot banner yet
    #[error("Grbl has not finished booting")]
    NotReady,

    /// The transport is not open
    #[error("Controller not connected")]
    NotConnected,
}

/// Connection error type
///
/// Represents failures of the transport the controller streams through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// A line or real-time byte could not be handed to the transport
    #[error("Failed to send: {reason}")]
    SendFailed {
        /// The reason the send failed.
        reason: String,
    },

    /// The transport is not open
    #[error("Connection is not open")]
    NotOpen,
}

/// Firmware error type
///
/// Represents problems interpreting what the device reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FirmwareError {
    /// Response parsing error
    #[error("Failed to parse firmware response: {reason}")]
    ResponseParseError {
        /// The reason the response parsing failed.
        reason: String,
    },
}

/// Main error type for GrblStream
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Firmware error
    #[error(transparent)]
    Firmware(#[from] FirmwareError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a retryable precondition failure
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::Controller(
                ControllerError::OutstandingCommands { .. }
                    | ControllerError::NotReady
                    | ControllerError::NotConnected
            )
        )
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is an I/O error
    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outstanding_commands_message() {
        let err = ControllerError::OutstandingCommands {
            outgoing: 2,
            awaiting: 1,
        };
        let text = err.to_string();
        assert!(text.starts_with("Cannot begin streaming"));
        assert!(text.contains("2 outgoing"));
        assert!(text.contains("1 awaiting"));
    }

    #[test]
    fn test_not_ready_message() {
        assert_eq!(
            ControllerError::NotReady.to_string(),
            "Grbl has not finished booting"
        );
    }

    #[test]
    fn test_classification() {
        let err: Error = ControllerError::NotReady.into();
        assert!(err.is_precondition());
        assert!(!err.is_connection_error());

        let err: Error = ConnectionError::SendFailed {
            reason: "port gone".to_string(),
        }
        .into();
        assert!(err.is_connection_error());
        assert!(!err.is_precondition());

        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.is_io_error());
    }
}
