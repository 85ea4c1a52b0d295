//! Transport contract
//!
//! The controller never touches a serial port directly. It hands finished
//! lines and real-time bytes to a [`Transport`], which owns the byte
//! channel. Every call is fire-and-forget: results (send confirmations,
//! device responses, capability hints) are reported back later by whoever
//! drives the transport, through
//! [`GrblController::handle`](crate::GrblController::handle).

pub mod loopback;

use grblstream_core::ConnectionError;

/// GRBL real-time feed hold
pub const PAUSE_COMMAND: u8 = b'!';

/// GRBL real-time cycle start / resume
pub const RESUME_COMMAND: u8 = b'~';

/// Bidirectional byte channel to a GRBL device
///
/// Implementations must not call back into the controller from inside
/// these methods; the controller may hold internal locks while calling them.
pub trait Transport: Send {
    /// Open the channel
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<(), ConnectionError>;

    /// Close the channel
    fn close(&mut self);

    /// Check if the channel is open
    fn is_open(&self) -> bool;

    /// Queue a newline-terminated line for transmission
    ///
    /// `sequence` identifies the command so the driver can report the
    /// matching send confirmation.
    fn send(&mut self, sequence: u32, line: &str) -> Result<(), ConnectionError>;

    /// Transmit a single real-time byte ahead of any queued lines
    fn send_immediate(&mut self, byte: u8) -> Result<(), ConnectionError>;

    /// Stop transmitting queued lines
    fn pause(&mut self);

    /// Continue transmitting queued lines
    fn resume(&mut self);

    /// Drop every queued and in-flight line
    fn cancel(&mut self);
}

/// Transport that accepts everything and transmits nothing
#[derive(Debug, Default)]
pub struct NoOpTransport {
    open: bool,
}

impl NoOpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for NoOpTransport {
    fn open(&mut self, _port: &str, _baud_rate: u32) -> Result<(), ConnectionError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn send(&mut self, _sequence: u32, _line: &str) -> Result<(), ConnectionError> {
        if !self.open {
            return Err(ConnectionError::NotOpen);
        }
        Ok(())
    }

    fn send_immediate(&mut self, _byte: u8) -> Result<(), ConnectionError> {
        if !self.open {
            return Err(ConnectionError::NotOpen);
        }
        Ok(())
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn cancel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_requires_open() {
        let mut transport = NoOpTransport::new();
        assert!(!transport.is_open());
        assert_eq!(transport.send(1, "G0\n"), Err(ConnectionError::NotOpen));

        transport.open("loop", 115200).unwrap();
        assert!(transport.is_open());
        assert!(transport.send(1, "G0\n").is_ok());
        assert!(transport.send_immediate(PAUSE_COMMAND).is_ok());

        transport.close();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_realtime_bytes() {
        assert_eq!(PAUSE_COMMAND, 0x21);
        assert_eq!(RESUME_COMMAND, 0x7E);
    }
}
