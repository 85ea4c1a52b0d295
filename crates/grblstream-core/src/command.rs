//! G-code command entity and lifecycle
//!
//! A [`GcodeCommand`] is created when a line is accepted for queueing and
//! walks exactly one path through [`CommandState`]:
//!
//! ```text
//! Pending -> Outgoing -> AwaitingResponse -> Completed | Errored
//! Pending -> Skipped
//! ```
//!
//! The sequence number is assigned once by a [`CommandNumberGenerator`] and
//! the response text is attached at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Synthetic response attached to lines that preprocess down to nothing
pub const SKIPPED_RESPONSE: &str = "<skipped by application>";

/// Command lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandState {
    /// Accepted, not yet preprocessed
    Pending,
    /// Handed to the transport, send not yet confirmed
    Outgoing,
    /// Send confirmed, awaiting the device acknowledgement
    AwaitingResponse,
    /// Acknowledged with `ok`
    Completed,
    /// Acknowledged with an error
    Errored,
    /// Blank after preprocessing; never transmitted
    Skipped,
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Outgoing => write!(f, "Outgoing"),
            Self::AwaitingResponse => write!(f, "AwaitingResponse"),
            Self::Completed => write!(f, "Completed"),
            Self::Errored => write!(f, "Errored"),
            Self::Skipped => write!(f, "Skipped"),
        }
    }
}

/// A single line of g-code tracked from submission to acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcodeCommand {
    sequence: u32,
    command: String,
    processed: Option<String>,
    state: CommandState,
    sent: bool,
    response: Option<String>,
    error: bool,
    created_at: DateTime<Utc>,
}

impl GcodeCommand {
    /// Create a pending command with a pre-assigned sequence number
    pub fn new(command: impl Into<String>, sequence: u32) -> Self {
        Self {
            sequence,
            command: command.into(),
            processed: None,
            state: CommandState::Pending,
            sent: false,
            response: None,
            error: false,
            created_at: Utc::now(),
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Text as submitted
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Text after preprocessing, if preprocessing has happened
    pub fn processed(&self) -> Option<&str> {
        self.processed.as_deref()
    }

    /// Text that goes on the wire
    pub fn wire_text(&self) -> &str {
        self.processed.as_deref().unwrap_or(&self.command)
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// True once the transport has confirmed transmission
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    /// True when the device acknowledged this command with an error
    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn is_skipped(&self) -> bool {
        self.state == CommandState::Skipped
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Record the preprocessed text
    pub fn set_processed(&mut self, text: impl Into<String>) -> &mut Self {
        debug_assert!(
            self.state == CommandState::Pending,
            "set_processed called on command #{} in {:?} state (expected Pending)",
            self.sequence,
            self.state
        );
        self.processed = Some(text.into());
        self
    }

    /// Handed to the transport
    pub fn mark_outgoing(&mut self) -> &mut Self {
        debug_assert!(
            self.state == CommandState::Pending,
            "mark_outgoing called on command #{} in {:?} state (expected Pending)",
            self.sequence,
            self.state
        );
        self.state = CommandState::Outgoing;
        self
    }

    /// Transport confirmed the line left the host
    pub fn mark_sent(&mut self) -> &mut Self {
        debug_assert!(
            self.state == CommandState::Outgoing,
            "mark_sent called on command #{} in {:?} state (expected Outgoing)",
            self.sequence,
            self.state
        );
        self.sent = true;
        self.state = CommandState::AwaitingResponse;
        self
    }

    /// Device acknowledged with `ok`
    pub fn mark_completed(&mut self, response: impl Into<String>) -> &mut Self {
        debug_assert!(
            self.state == CommandState::AwaitingResponse,
            "mark_completed called on command #{} in {:?} state (expected AwaitingResponse)",
            self.sequence,
            self.state
        );
        self.set_response(response.into());
        self.state = CommandState::Completed;
        self
    }

    /// Device acknowledged with an error
    pub fn mark_errored(&mut self, response: impl Into<String>) -> &mut Self {
        debug_assert!(
            self.state == CommandState::AwaitingResponse,
            "mark_errored called on command #{} in {:?} state (expected AwaitingResponse)",
            self.sequence,
            self.state
        );
        self.set_response(response.into());
        self.error = true;
        self.state = CommandState::Errored;
        self
    }

    /// Nothing left to send after preprocessing
    pub fn mark_skipped(&mut self) -> &mut Self {
        debug_assert!(
            self.state == CommandState::Pending,
            "mark_skipped called on command #{} in {:?} state (expected Pending)",
            self.sequence,
            self.state
        );
        self.set_response(SKIPPED_RESPONSE.to_string());
        self.state = CommandState::Skipped;
        self
    }

    fn set_response(&mut self, response: String) {
        debug_assert!(
            self.response.is_none(),
            "response for command #{} set twice",
            self.sequence
        );
        if self.response.is_none() {
            self.response = Some(response);
        }
    }
}

impl fmt::Display for GcodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} [{}] {}", self.sequence, self.state, self.command)
    }
}

/// Monotonic sequence source shared by everything that creates commands
///
/// Numbers start at 1 and are never handed out twice.
#[derive(Clone)]
pub struct CommandNumberGenerator {
    counter: Arc<AtomicU32>,
}

impl CommandNumberGenerator {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Take the next sequence number
    pub fn next(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Create a pending command with the next sequence number
    pub fn command(&self, text: impl Into<String>) -> GcodeCommand {
        GcodeCommand::new(text, self.next())
    }
}

impl Default for CommandNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut cmd = GcodeCommand::new("G1 X10 F100", 7);
        assert_eq!(cmd.state(), CommandState::Pending);
        assert_eq!(cmd.wire_text(), "G1 X10 F100");

        cmd.set_processed("G1 X10 F200");
        cmd.mark_outgoing();
        assert!(!cmd.is_sent());
        cmd.mark_sent();
        assert!(cmd.is_sent());
        assert_eq!(cmd.state(), CommandState::AwaitingResponse);
        cmd.mark_completed("ok");

        assert_eq!(cmd.state(), CommandState::Completed);
        assert_eq!(cmd.response(), Some("ok"));
        assert_eq!(cmd.wire_text(), "G1 X10 F200");
        assert!(!cmd.is_error());
    }

    #[test]
    fn test_errored_sets_flag() {
        let mut cmd = GcodeCommand::new("G99", 1);
        cmd.mark_outgoing().mark_sent().mark_errored("error:20");
        assert!(cmd.is_error());
        assert_eq!(cmd.state(), CommandState::Errored);
        assert_eq!(cmd.response(), Some("error:20"));
    }

    #[test]
    fn test_skipped_never_sent() {
        let mut cmd = GcodeCommand::new("(just a comment)", 3);
        cmd.set_processed("");
        cmd.mark_skipped();
        assert!(cmd.is_skipped());
        assert!(!cmd.is_sent());
        assert_eq!(cmd.response(), Some(SKIPPED_RESPONSE));
    }

    #[test]
    fn test_generator_starts_at_one() {
        let gen = CommandNumberGenerator::new();
        assert_eq!(gen.next(), 1);
        assert_eq!(gen.command("G0").sequence(), 2);
        assert_eq!(gen.next(), 3);
    }

    #[test]
    fn test_generator_clones_share_counter() {
        let a = CommandNumberGenerator::new();
        let b = a.clone();
        assert_eq!(a.next(), 1);
        assert_eq!(b.next(), 2);
    }
}
