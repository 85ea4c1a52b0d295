//! GRBL Streaming Controller
//!
//! [`GrblController`] turns queued g-code lines into a paced stream for a
//! GRBL device and accounts for every line exactly once.
//!
//! Two sources drive it, possibly from different threads: the controlling
//! caller (enqueue, begin, pause, resume, cancel) and the transport driver
//! reporting send confirmations and device lines. Both can be expressed as
//! [`ControllerInput`] values and fed through [`GrblController::handle`].
//!
//! All queue state sits behind one mutex. Listener notifications are
//! collected while it is held and delivered after it is released, before
//! the triggering call returns. A second, reentrant lock is held from
//! taking the queue lock until delivery finishes, so listeners observe
//! events in the order the queues changed, whichever thread caused them.

use crate::communication::{Transport, PAUSE_COMMAND, RESUME_COMMAND};
use crate::firmware::capabilities::{Capability, CapabilityState};
use crate::firmware::grbl::preprocess::preprocess;
use crate::firmware::grbl::queues::{CommandQueues, QueueSizes};
use crate::firmware::grbl::response_parser::GrblResponse;
use crate::firmware::grbl::status_parser::parse_status_report;
use crate::firmware::grbl::version::GrblVersion;
use chrono::{DateTime, Utc};
use grblstream_core::{
    CommandNumberGenerator, ControllerError, ControllerEvent, ControllerListener, ControllerStatus,
    ListenerHandle, ListenerRegistry, Result, StatusBuilder, Units,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Discrete inputs accepted by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerInput {
    /// Queue a line for the next job
    Enqueue(String),
    /// Start draining the pending queue
    BeginStreaming,
    /// Feed hold
    Pause,
    /// Cycle start
    Resume,
    /// Drop everything
    Cancel,
    /// Transport confirmed a line left the host
    SendConfirmed(u32),
    /// Transport received a line from the device
    Response(String),
    /// Transport detected a capability
    Capability(Capability),
}

#[derive(Debug, Default)]
struct JobMetrics {
    rows: usize,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    filename: Option<String>,
}

#[derive(Debug, Default)]
struct StreamState {
    queues: CommandQueues,
    streaming: bool,
    job: JobMetrics,
}

#[derive(Debug, Default)]
struct FirmwareState {
    version: Option<GrblVersion>,
    capabilities: CapabilityState,
    last_status: Option<Arc<ControllerStatus>>,
}

fn console(message: impl Into<String>) -> ControllerEvent {
    ControllerEvent::ConsoleMessage {
        message: message.into(),
        verbose: false,
    }
}

fn verbose(message: impl Into<String>) -> ControllerEvent {
    ControllerEvent::ConsoleMessage {
        message: message.into(),
        verbose: true,
    }
}

/// GRBL streaming controller
pub struct GrblController {
    transport: Mutex<Box<dyn Transport>>,
    delivery: ReentrantMutex<()>,
    stream: Mutex<StreamState>,
    firmware: RwLock<FirmwareState>,
    listeners: RwLock<ListenerRegistry>,
    numbers: CommandNumberGenerator,
    speed_override: AtomicI32,
}

impl GrblController {
    /// Create a controller streaming through `transport`
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Mutex::new(transport),
            delivery: ReentrantMutex::new(()),
            stream: Mutex::new(StreamState::default()),
            firmware: RwLock::new(FirmwareState::default()),
            listeners: RwLock::new(ListenerRegistry::new()),
            numbers: CommandNumberGenerator::new(),
            speed_override: AtomicI32::new(-1),
        }
    }

    // ---- listeners ----

    pub fn add_listener(&self, listener: Arc<dyn ControllerListener>) -> ListenerHandle {
        self.listeners.write().add(listener)
    }

    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.listeners.write().remove(handle)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn emit(&self, events: Vec<ControllerEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.read().snapshot();
        for event in &events {
            for listener in &listeners {
                event.deliver(listener.as_ref());
            }
        }
    }

    /// Run `f` against the stream state, then deliver the events it
    /// collected before any other thread can change the queues again
    fn sequenced<T>(
        &self,
        f: impl FnOnce(&mut StreamState, &mut Vec<ControllerEvent>) -> T,
    ) -> T {
        let _delivery = self.delivery.lock();
        let mut events = Vec::new();
        let out = {
            let mut stream = self.stream.lock();
            f(&mut *stream, &mut events)
        };
        self.emit(events);
        out
    }

    // ---- connection ----

    /// Open the transport and announce the connection on the console
    pub fn open_comm_port(&self, port: &str, baud_rate: u32) -> Result<()> {
        self.transport.lock().open(port, baud_rate).inspect_err(|e| {
            error!(port, baud_rate, "Failed to open transport: {}", e);
        })?;
        info!(port, baud_rate, "Connected");
        self.emit(vec![console(format!(
            "**** Connected to {} @ {} baud ****",
            port, baud_rate
        ))]);
        Ok(())
    }

    pub fn close_comm_port(&self) {
        self.emit(vec![console("**** Connection closed ****")]);
        self.transport.lock().close();
        info!("Connection closed");
    }

    /// Fails unless the transport is open and the boot banner has been seen
    pub fn is_ready_to_stream_file(&self) -> Result<()> {
        if !self.transport.lock().is_open() {
            return Err(ControllerError::NotConnected.into());
        }
        if self.firmware.read().version.is_none() {
            return Err(ControllerError::NotReady.into());
        }
        Ok(())
    }

    // ---- configuration ----

    /// Rewrite the feed word of every line preprocessed from now on.
    /// Zero or negative disables the rewrite.
    pub fn set_speed_override(&self, speed: i32) {
        debug!(speed, "Speed override set");
        self.speed_override.store(speed, Ordering::SeqCst);
    }

    pub fn speed_override(&self) -> i32 {
        self.speed_override.load(Ordering::SeqCst)
    }

    // ---- queueing ----

    /// Append a line to the pending queue; returns its sequence number
    pub fn enqueue(&self, text: impl Into<String>) -> u32 {
        self.sequenced(|stream, events| {
            let command = self.numbers.command(text);
            let sequence = command.sequence();
            events.push(ControllerEvent::CommandQueued(command.clone()));
            stream.queues.push_pending(command);
            sequence
        })
    }

    /// Read a whole file and queue its lines. Nothing is queued if the
    /// read fails. Returns the number of lines queued.
    pub fn append_gcode_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).inspect_err(|e| {
            error!(path = %path.display(), "Failed to read g-code file: {}", e);
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let count = self.sequenced(|stream, events| {
            stream.job.filename = filename;
            for line in contents.lines() {
                let command = self.numbers.command(line);
                events.push(ControllerEvent::CommandQueued(command.clone()));
                stream.queues.push_pending(command);
            }
            events.len()
        });
        info!(path = %path.display(), lines = count, "Loaded g-code file");
        Ok(count)
    }

    /// Send a line right away, bypassing the pending queue and preprocessing
    pub fn queue_string_for_comm(&self, text: impl Into<String>) -> Result<()> {
        let mut command = self.numbers.command(text);
        command.mark_outgoing();
        let sequence = command.sequence();
        let line = format!("{}\n", command.wire_text());
        // Outgoing order must match transport order.
        let mut stream = self.stream.lock();
        stream.queues.push_outgoing(command);
        self.transport.lock().send(sequence, &line).inspect_err(|e| {
            error!(sequence, "Failed to send command: {}", e);
        })?;
        Ok(())
    }

    // ---- streaming ----

    /// Drain the pending queue into the transport.
    ///
    /// Fails without touching any state while commands are outgoing or
    /// awaiting a response. A transport failure stops the drain; lines
    /// already handed over stay where they are.
    pub fn begin_streaming(&self) -> Result<()> {
        self.sequenced(|stream, _| -> Result<()> {
            stream.queues.ensure_idle()?;
            stream.streaming = true;
            stream.job.rows = stream.queues.pending_len();
            stream.job.started_at = Some(Utc::now());
            stream.job.stopped_at = None;
            info!(rows = stream.job.rows, "Beginning stream");
            Ok(())
        })?;

        while self.sequenced(|stream, events| self.stream_next(stream, events))? {}

        // An empty job, or a drain raced by acknowledgements, ends here.
        self.sequenced(|stream, events| Self::finish_if_drained(stream, events));
        Ok(())
    }

    /// Move one pending command on; false once nothing is pending
    fn stream_next(
        &self,
        stream: &mut StreamState,
        events: &mut Vec<ControllerEvent>,
    ) -> Result<bool> {
        let Some(mut command) = stream.queues.pop_pending() else {
            return Ok(false);
        };

        let processed = preprocess(command.command(), self.speed_override());
        if let Some(comment) = &processed.comment {
            events.push(ControllerEvent::CommandComment(comment.clone()));
        }
        let blank = processed.is_blank();
        command.set_processed(processed.text);

        if blank {
            debug!(sequence = command.sequence(), "Skipping blank command");
            events.push(console(format!("Skipping command #{}", command.sequence())));
            command.mark_skipped();
            events.push(ControllerEvent::CommandSent(command.clone()));
            events.push(ControllerEvent::CommandCompleted(command.clone()));
            stream.queues.complete_skipped(command);
            Self::finish_if_drained(stream, events);
            return Ok(true);
        }

        command.mark_outgoing();
        let line = format!("{}\n", command.wire_text());
        let sequence = command.sequence();
        stream.queues.push_outgoing(command);
        if let Err(e) = self.transport.lock().send(sequence, &line) {
            error!(sequence, "Stream aborted, failed to send: {}", e);
            stream.streaming = false;
            stream.job.started_at = None;
            return Err(e.into());
        }
        Ok(true)
    }

    fn finish_if_drained(stream: &mut StreamState, events: &mut Vec<ControllerEvent>) {
        if !stream.streaming || !stream.queues.is_drained() {
            return;
        }
        stream.streaming = false;
        stream.job.stopped_at = Some(Utc::now());
        info!(
            rows = stream.job.rows,
            errored = stream.queues.sizes().errored,
            "Finished sending file"
        );
        events.push(console("**** Finished sending file. ****"));
        events.push(ControllerEvent::StreamComplete {
            filename: stream.job.filename.take(),
            success: true,
        });
    }

    /// Hold further sends; real-time capable firmware also gets `!`
    pub fn pause(&self) -> Result<()> {
        self.emit(vec![console("**** Pausing file transfer. ****")]);
        let real_time = self.firmware.read().capabilities.is_real_time_capable();
        let mut transport = self.transport.lock();
        transport.pause();
        if real_time {
            transport.send_immediate(PAUSE_COMMAND)?;
        }
        Ok(())
    }

    /// Continue sending; real-time capable firmware also gets `~`
    pub fn resume(&self) -> Result<()> {
        self.emit(vec![console("**** Resuming file transfer. ****")]);
        let real_time = self.firmware.read().capabilities.is_real_time_capable();
        let mut transport = self.transport.lock();
        transport.resume();
        if real_time {
            transport.send_immediate(RESUME_COMMAND)?;
        }
        Ok(())
    }

    /// Empty every queue and tell the transport to drop in-flight lines.
    /// Discarded commands get no further events.
    pub fn cancel(&self) {
        self.emit(vec![console("**** Canceling file transfer. ****")]);
        self.sequenced(|stream, _| {
            let sizes = stream.queues.sizes();
            stream.queues.clear();
            stream.job.filename = None;
            if stream.streaming {
                stream.streaming = false;
                stream.job.stopped_at = Some(Utc::now());
            }
            info!(%sizes, "Stream canceled");
        });
        self.transport.lock().cancel();
    }

    // ---- transport callbacks ----

    /// The transport confirmed the line with this sequence number was sent
    pub fn command_sent(&self, sequence: u32) {
        self.sequenced(|stream, events| match stream.queues.confirm_sent(sequence) {
            Some(command) => events.push(ControllerEvent::CommandSent(command)),
            None => warn!(sequence, "Send confirmation with nothing outgoing"),
        });
    }

    fn command_response(&self, response: &str, is_error: bool) {
        self.sequenced(|stream, events| match stream.queues.acknowledge(response, is_error) {
            Some(command) => {
                events.push(ControllerEvent::CommandCompleted(command));
                Self::finish_if_drained(stream, events);
            }
            None => warn!(response, "Acknowledgement with nothing awaiting a response"),
        });
    }

    /// Classify and act on one line received from the device
    pub fn raw_response(&self, line: &str) {
        let Some(response) = GrblResponse::parse(line) else {
            return;
        };
        let line = line.trim();
        match response {
            GrblResponse::Ok => self.command_response(line, false),
            GrblResponse::Error { .. } => {
                self.emit(vec![console(response.describe())]);
                self.command_response(line, true);
            }
            GrblResponse::Version(version) => self.on_version(line, version),
            GrblResponse::Status(_) => self.on_status_report(line),
            GrblResponse::Alarm(code) => {
                warn!(code, "Alarm reported");
                self.emit(vec![console(response.describe())]);
            }
            GrblResponse::Message(_) => self.emit(vec![console(line)]),
        }
    }

    fn on_version(&self, banner: &str, version: GrblVersion) {
        let capabilities = version.capabilities();
        {
            let mut firmware = self.firmware.write();
            firmware.version = Some(version);
            firmware.capabilities = capabilities;
        }
        info!(
            %version,
            real_time = capabilities.is_real_time_capable(),
            position_mode = ?capabilities.position_mode(),
            "Grbl version negotiated"
        );
        self.emit(vec![console(banner)]);
    }

    fn on_status_report(&self, report: &str) {
        let mut events = vec![verbose(report)];
        let mode = self.firmware.read().capabilities.position_mode();
        if mode.is_none() {
            debug!(report, "Status report before a position capability, ignoring");
        } else {
            match parse_status_report(report, Units::MM) {
                Ok(patch) => {
                    let status = {
                        let mut firmware = self.firmware.write();
                        let status =
                            Arc::new(StatusBuilder::build(firmware.last_status.as_deref(), patch));
                        firmware.last_status = Some(Arc::clone(&status));
                        status
                    };
                    events.push(ControllerEvent::StatusUpdate(status));
                }
                Err(e) => warn!(report, "Unreadable status report: {}", e),
            }
        }
        self.emit(events);
    }

    /// Record a capability detected by the transport
    pub fn on_capability(&self, capability: Capability) {
        info!(%capability, "Found capability");
        self.firmware.write().capabilities.apply(capability);
    }

    /// Single entry point for callers and transport drivers alike
    pub fn handle(&self, input: ControllerInput) -> Result<()> {
        match input {
            ControllerInput::Enqueue(text) => {
                self.enqueue(text);
            }
            ControllerInput::BeginStreaming => self.begin_streaming()?,
            ControllerInput::Pause => self.pause()?,
            ControllerInput::Resume => self.resume()?,
            ControllerInput::Cancel => self.cancel(),
            ControllerInput::SendConfirmed(sequence) => self.command_sent(sequence),
            ControllerInput::Response(line) => self.raw_response(&line),
            ControllerInput::Capability(capability) => self.on_capability(capability),
        }
        Ok(())
    }

    // ---- job metrics ----

    pub fn is_streaming(&self) -> bool {
        self.stream.lock().streaming
    }

    /// Time spent on the current or last job
    pub fn send_duration(&self) -> Option<chrono::Duration> {
        let stream = self.stream.lock();
        let started = stream.job.started_at?;
        let end = if stream.streaming {
            Utc::now()
        } else {
            stream.job.stopped_at?
        };
        Some(end - started)
    }

    /// Job size captured when streaming began
    pub fn rows_in_send(&self) -> usize {
        self.stream.lock().job.rows
    }

    pub fn rows_sent(&self) -> usize {
        let stream = self.stream.lock();
        stream.job.rows.saturating_sub(stream.queues.outgoing_len())
    }

    pub fn rows_remaining(&self) -> usize {
        self.stream.lock().queues.outgoing_len()
    }

    pub fn queue_sizes(&self) -> QueueSizes {
        self.stream.lock().queues.sizes()
    }

    /// Commands in the completed list that were skipped rather than sent
    pub fn skipped_count(&self) -> usize {
        self.stream
            .lock()
            .queues
            .completed()
            .iter()
            .filter(|c| c.is_skipped())
            .count()
    }

    // ---- firmware ----

    pub fn firmware_version(&self) -> Option<GrblVersion> {
        self.firmware.read().version
    }

    pub fn capabilities(&self) -> CapabilityState {
        self.firmware.read().capabilities
    }

    pub fn last_status(&self) -> Option<Arc<ControllerStatus>> {
        self.firmware.read().last_status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::NoOpTransport;

    fn controller() -> GrblController {
        GrblController::new(Box::new(NoOpTransport::new()))
    }

    #[test]
    fn test_enqueue_assigns_increasing_sequences() {
        let ctrl = controller();
        let a = ctrl.enqueue("G0 X1");
        let b = ctrl.enqueue("G0 X2");
        assert!(b > a);
        assert_eq!(ctrl.queue_sizes().pending, 2);
    }

    #[test]
    fn test_banner_negotiates_capabilities() {
        let ctrl = controller();
        assert!(ctrl.firmware_version().is_none());
        ctrl.raw_response("Grbl 0.8c ['$' for help]");

        let caps = ctrl.capabilities();
        assert!(caps.is_real_time_capable());
        assert_eq!(caps.position_mode(), Some(Capability::PositionC));
        assert_eq!(ctrl.firmware_version().unwrap().letter, Some('c'));
    }

    #[test]
    fn test_status_ignored_without_position_mode() {
        let ctrl = controller();
        ctrl.raw_response("<Idle,MPos:1.000,2.000,3.000>");
        assert!(ctrl.last_status().is_none());

        ctrl.on_capability(Capability::PositionC);
        ctrl.raw_response("<Idle,MPos:1.000,2.000,3.000>");
        let status = ctrl.last_status().unwrap();
        assert_eq!(status.machine_coord.unwrap().x, 1.0);
    }

    #[test]
    fn test_readiness() {
        let ctrl = controller();
        assert!(matches!(
            ctrl.is_ready_to_stream_file(),
            Err(grblstream_core::Error::Controller(
                ControllerError::NotConnected
            ))
        ));
        ctrl.open_comm_port("loop", 115200).unwrap();
        assert!(matches!(
            ctrl.is_ready_to_stream_file(),
            Err(grblstream_core::Error::Controller(ControllerError::NotReady))
        ));
        ctrl.raw_response("Grbl 1.1h ['$' for help]");
        assert!(ctrl.is_ready_to_stream_file().is_ok());
    }

    #[test]
    fn test_metrics_before_any_job() {
        let ctrl = controller();
        assert!(!ctrl.is_streaming());
        assert!(ctrl.send_duration().is_none());
        assert_eq!(ctrl.rows_in_send(), 0);
        assert_eq!(ctrl.rows_sent(), 0);
        assert_eq!(ctrl.rows_remaining(), 0);
    }
}
