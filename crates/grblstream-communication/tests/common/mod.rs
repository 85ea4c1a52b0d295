#![allow(dead_code)]

use grblstream_communication::{GrblController, Transport};
use grblstream_core::{ConnectionError, ControllerListener, ControllerStatus, GcodeCommand};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct TransportLog {
    pub lines: Vec<(u32, String)>,
    pub realtime: Vec<u8>,
    pub paused: bool,
    pub cancels: usize,
    pub open: bool,
    /// Fail every send once this many lines have been accepted
    pub fail_after: Option<usize>,
}

/// Transport that records everything handed to it
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub log: Arc<Mutex<TransportLog>>,
}

impl Transport for RecordingTransport {
    fn open(&mut self, _port: &str, _baud_rate: u32) -> Result<(), ConnectionError> {
        self.log.lock().open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().open = false;
    }

    fn is_open(&self) -> bool {
        self.log.lock().open
    }

    fn send(&mut self, sequence: u32, line: &str) -> Result<(), ConnectionError> {
        let mut log = self.log.lock();
        if log.fail_after.is_some_and(|n| log.lines.len() >= n) {
            return Err(ConnectionError::SendFailed {
                reason: "port unplugged".to_string(),
            });
        }
        log.lines.push((sequence, line.to_string()));
        Ok(())
    }

    fn send_immediate(&mut self, byte: u8) -> Result<(), ConnectionError> {
        self.log.lock().realtime.push(byte);
        Ok(())
    }

    fn pause(&mut self) {
        self.log.lock().paused = true;
    }

    fn resume(&mut self) {
        self.log.lock().paused = false;
    }

    fn cancel(&mut self) {
        self.log.lock().cancels += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Queued(u32),
    Sent(u32),
    Completed(u32, Option<String>),
    Comment(String),
    Console(String, bool),
    Status(ControllerStatus),
    StreamComplete(Option<String>, bool),
}

/// Listener that records every notification in order
#[derive(Clone, Default)]
pub struct RecordingListener {
    pub events: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingListener {
    pub fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn consoles(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::Console(msg, _) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ControllerListener for RecordingListener {
    fn command_queued(&self, command: &GcodeCommand) {
        self.events.lock().push(Recorded::Queued(command.sequence()));
    }

    fn command_sent(&self, command: &GcodeCommand) {
        self.events.lock().push(Recorded::Sent(command.sequence()));
    }

    fn command_completed(&self, command: &GcodeCommand) {
        self.events.lock().push(Recorded::Completed(
            command.sequence(),
            command.response().map(str::to_string),
        ));
    }

    fn command_comment(&self, comment: &str) {
        self.events.lock().push(Recorded::Comment(comment.to_string()));
    }

    fn message_for_console(&self, message: &str, verbose: bool) {
        self.events
            .lock()
            .push(Recorded::Console(message.to_string(), verbose));
    }

    fn status_update(&self, status: &ControllerStatus) {
        self.events.lock().push(Recorded::Status(status.clone()));
    }

    fn stream_complete(&self, filename: Option<&str>, success: bool) {
        self.events.lock().push(Recorded::StreamComplete(
            filename.map(str::to_string),
            success,
        ));
    }
}

pub struct Harness {
    pub controller: GrblController,
    pub transport: Arc<Mutex<TransportLog>>,
    pub listener: RecordingListener,
}

impl Harness {
    pub fn new() -> Self {
        let transport = RecordingTransport::default();
        let log = Arc::clone(&transport.log);
        let controller = GrblController::new(Box::new(transport));
        let listener = RecordingListener::default();
        controller.add_listener(Arc::new(listener.clone()));
        Self {
            controller,
            transport: log,
            listener,
        }
    }

    /// Sequence numbers of the lines handed to the transport
    pub fn sent_sequences(&self) -> Vec<u32> {
        self.transport.lock().lines.iter().map(|(s, _)| *s).collect()
    }

    pub fn sent_lines(&self) -> Vec<String> {
        self.transport
            .lock()
            .lines
            .iter()
            .map(|(_, l)| l.clone())
            .collect()
    }

    /// Confirm and acknowledge every transmitted line with `ok`
    pub fn ack_all(&self) {
        for sequence in self.sent_sequences() {
            self.controller.command_sent(sequence);
            self.controller.raw_response("ok");
        }
    }
}
