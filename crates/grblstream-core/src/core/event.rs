//! Event system for controller communication
//!
//! Provides:
//! - [`ControllerEvent`], an owned value for each of the seven notifications
//!   a controller emits
//! - [`EventDispatcher`], a listener that republishes those events on a
//!   tokio broadcast channel for async subscribers

use crate::command::GcodeCommand;
use crate::core::listener::ControllerListener;
use crate::data::ControllerStatus;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Controller event types
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Command accepted into the pending queue
    CommandQueued(GcodeCommand),
    /// Command sent (or skipped)
    CommandSent(GcodeCommand),
    /// Command acknowledged (or skipped)
    CommandCompleted(GcodeCommand),
    /// Comment extracted during preprocessing
    CommandComment(String),
    /// Console text
    ConsoleMessage {
        /// Message text.
        message: String,
        /// Verbose-only messages (raw status reports) are flagged.
        verbose: bool,
    },
    /// New status snapshot
    StatusUpdate(Arc<ControllerStatus>),
    /// Job finished
    StreamComplete {
        /// File the job was loaded from, if any.
        filename: Option<String>,
        /// Whether the job completed successfully.
        success: bool,
    },
}

impl ControllerEvent {
    /// Call the matching listener method
    pub fn deliver(&self, listener: &dyn ControllerListener) {
        match self {
            ControllerEvent::CommandQueued(cmd) => listener.command_queued(cmd),
            ControllerEvent::CommandSent(cmd) => listener.command_sent(cmd),
            ControllerEvent::CommandCompleted(cmd) => listener.command_completed(cmd),
            ControllerEvent::CommandComment(comment) => listener.command_comment(comment),
            ControllerEvent::ConsoleMessage { message, verbose } => {
                listener.message_for_console(message, *verbose)
            }
            ControllerEvent::StatusUpdate(status) => listener.status_update(status),
            ControllerEvent::StreamComplete { filename, success } => {
                listener.stream_complete(filename.as_deref(), *success)
            }
        }
    }
}

impl std::fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerEvent::CommandQueued(cmd) => write!(f, "Queued {}", cmd),
            ControllerEvent::CommandSent(cmd) => write!(f, "Sent {}", cmd),
            ControllerEvent::CommandCompleted(cmd) => write!(f, "Completed {}", cmd),
            ControllerEvent::CommandComment(comment) => write!(f, "Comment: {}", comment),
            ControllerEvent::ConsoleMessage { message, .. } => write!(f, "{}", message),
            ControllerEvent::StatusUpdate(status) => write!(f, "Status: {}", status),
            ControllerEvent::StreamComplete { filename, success } => write!(
                f,
                "Stream complete ({}, success={})",
                filename.as_deref().unwrap_or("<direct>"),
                success
            ),
        }
    }
}

/// Event dispatcher for publishing events to async subscribers
///
/// Register it as a controller listener; every notification is converted
/// to an owned [`ControllerEvent`] and broadcast. Events are dropped when
/// nobody is subscribed.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: broadcast::Sender<ControllerEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.tx.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn forward(&self, event: ControllerEvent) {
        if self.tx.receiver_count() > 0 {
            // A send error only means every receiver went away meanwhile.
            let _ = self.tx.send(event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ControllerListener for EventDispatcher {
    fn command_queued(&self, command: &GcodeCommand) {
        self.forward(ControllerEvent::CommandQueued(command.clone()));
    }

    fn command_sent(&self, command: &GcodeCommand) {
        self.forward(ControllerEvent::CommandSent(command.clone()));
    }

    fn command_completed(&self, command: &GcodeCommand) {
        self.forward(ControllerEvent::CommandCompleted(command.clone()));
    }

    fn command_comment(&self, comment: &str) {
        self.forward(ControllerEvent::CommandComment(comment.to_string()));
    }

    fn message_for_console(&self, message: &str, verbose: bool) {
        self.forward(ControllerEvent::ConsoleMessage {
            message: message.to_string(),
            verbose,
        });
    }

    fn status_update(&self, status: &ControllerStatus) {
        self.forward(ControllerEvent::StatusUpdate(Arc::new(status.clone())));
    }

    fn stream_complete(&self, filename: Option<&str>, success: bool) {
        self.forward(ControllerEvent::StreamComplete {
            filename: filename.map(str::to_string),
            success,
        });
    }
}
