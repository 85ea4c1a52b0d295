//! In-process loopback transport
//!
//! Stands in for a device that accepts every line and answers `ok`. Lines
//! are held until [`LoopbackHandle::pump`] plays the device's part, which
//! keeps the controller's callbacks outside of any transport call.

use super::Transport;
use crate::firmware::grbl::controller::GrblController;
use grblstream_core::ConnectionError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct LoopbackState {
    port: Option<String>,
    paused: bool,
    queued: VecDeque<(u32, String)>,
    transmitted: Vec<String>,
    realtime: Vec<u8>,
}

/// Transport half, owned by the controller
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    state: Arc<Mutex<LoopbackState>>,
}

/// Device half, kept by whoever drives the loop
#[derive(Debug, Clone)]
pub struct LoopbackHandle {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle used to play the device side
    pub fn handle(&self) -> LoopbackHandle {
        LoopbackHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Transport for LoopbackTransport {
    fn open(&mut self, port: &str, _baud_rate: u32) -> Result<(), ConnectionError> {
        let mut state = self.state.lock();
        if state.port.is_some() {
            return Err(ConnectionError::FailedToOpen {
                port: port.to_string(),
                reason: "already open".to_string(),
            });
        }
        state.port = Some(port.to_string());
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.port = None;
        state.queued.clear();
    }

    fn is_open(&self) -> bool {
        self.state.lock().port.is_some()
    }

    fn send(&mut self, sequence: u32, line: &str) -> Result<(), ConnectionError> {
        let mut state = self.state.lock();
        if state.port.is_none() {
            return Err(ConnectionError::NotOpen);
        }
        state.queued.push_back((sequence, line.to_string()));
        Ok(())
    }

    fn send_immediate(&mut self, byte: u8) -> Result<(), ConnectionError> {
        let mut state = self.state.lock();
        if state.port.is_none() {
            return Err(ConnectionError::NotOpen);
        }
        state.realtime.push(byte);
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().paused = true;
    }

    fn resume(&mut self) {
        self.state.lock().paused = false;
    }

    fn cancel(&mut self) {
        self.state.lock().queued.clear();
    }
}

impl LoopbackHandle {
    /// Confirm and acknowledge every queued line, in order, until the queue
    /// is empty or the transport is paused. Returns the number of lines
    /// acknowledged.
    pub fn pump(&self, controller: &GrblController) -> usize {
        let mut count = 0;
        loop {
            // Release the state lock before calling into the controller.
            let next = {
                let mut state = self.state.lock();
                if state.paused {
                    None
                } else {
                    let next = state.queued.pop_front();
                    if let Some((_, line)) = &next {
                        state.transmitted.push(line.clone());
                    }
                    next
                }
            };
            let Some((sequence, line)) = next else {
                break;
            };
            debug!(sequence, line = line.trim_end(), "loopback ack");
            controller.command_sent(sequence);
            controller.raw_response("ok");
            count += 1;
        }
        count
    }

    /// Feed a device line (banner, status report, ...) to the controller
    pub fn reply(&self, controller: &GrblController, line: &str) {
        controller.raw_response(line);
    }

    /// Lines handed to the transport and not yet pumped
    pub fn queued_len(&self) -> usize {
        self.state.lock().queued.len()
    }

    /// Every line pumped so far
    pub fn transmitted(&self) -> Vec<String> {
        self.state.lock().transmitted.clone()
    }

    /// Every real-time byte sent so far
    pub fn realtime_bytes(&self) -> Vec<u8> {
        self.state.lock().realtime.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
}
