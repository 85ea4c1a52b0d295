//! Command queue manager
//!
//! Five FIFO queues, each command living in exactly one of them:
//!
//! | queue      | holds                                              |
//! |------------|----------------------------------------------------|
//! | pending    | accepted, not yet preprocessed                     |
//! | outgoing   | handed to the transport, send not confirmed        |
//! | awaiting   | send confirmed, no acknowledgement yet             |
//! | completed  | acknowledged with `ok`, or skipped                 |
//! | errored    | acknowledged with an error                         |
//!
//! Every method is a pure state transition; events and transport calls are
//! the controller's business.

use grblstream_core::{ControllerError, GcodeCommand};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::warn;

/// Length of every queue at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSizes {
    pub pending: usize,
    pub outgoing: usize,
    pub awaiting_response: usize,
    pub completed: usize,
    pub errored: usize,
}

impl fmt::Display for QueueSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pending={} outgoing={} awaiting={} completed={} errored={}",
            self.pending, self.outgoing, self.awaiting_response, self.completed, self.errored
        )
    }
}

#[derive(Debug, Default)]
pub struct CommandQueues {
    pending: VecDeque<GcodeCommand>,
    outgoing: VecDeque<GcodeCommand>,
    awaiting_response: VecDeque<GcodeCommand>,
    completed: Vec<GcodeCommand>,
    errored: Vec<GcodeCommand>,
}

impl CommandQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails while anything is outgoing or awaiting a response
    pub fn ensure_idle(&self) -> Result<(), ControllerError> {
        if self.outgoing.is_empty() && self.awaiting_response.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::OutstandingCommands {
                outgoing: self.outgoing.len(),
                awaiting: self.awaiting_response.len(),
            })
        }
    }

    pub fn push_pending(&mut self, command: GcodeCommand) {
        self.pending.push_back(command);
    }

    pub fn pop_pending(&mut self) -> Option<GcodeCommand> {
        self.pending.pop_front()
    }

    /// Append a command that has been marked outgoing
    pub fn push_outgoing(&mut self, command: GcodeCommand) {
        debug_assert_eq!(command.state(), grblstream_core::CommandState::Outgoing);
        self.outgoing.push_back(command);
    }

    /// File a skipped command directly under completed
    pub fn complete_skipped(&mut self, command: GcodeCommand) {
        debug_assert!(command.is_skipped());
        self.completed.push(command);
    }

    /// Move the head of outgoing to awaiting-response.
    ///
    /// Acknowledgements are strictly in order, so the head must be the
    /// confirmed command. Returns a copy of the moved command.
    pub fn confirm_sent(&mut self, sequence: u32) -> Option<GcodeCommand> {
        let mut command = self.outgoing.pop_front()?;
        debug_assert_eq!(
            command.sequence(),
            sequence,
            "send confirmation out of order"
        );
        if command.sequence() != sequence {
            warn!(
                expected = command.sequence(),
                confirmed = sequence,
                "Send confirmation does not match head of outgoing queue"
            );
        }
        command.mark_sent();
        let copy = command.clone();
        self.awaiting_response.push_back(command);
        Some(copy)
    }

    /// Attach a response to the head of awaiting-response and file it
    /// under completed or errored. Returns a copy of the filed command.
    pub fn acknowledge(&mut self, response: &str, is_error: bool) -> Option<GcodeCommand> {
        let mut command = self.awaiting_response.pop_front()?;
        if is_error {
            command.mark_errored(response);
            self.errored.push(command.clone());
        } else {
            command.mark_completed(response);
            self.completed.push(command.clone());
        }
        Some(command)
    }

    /// Nothing pending, outgoing or awaiting a response
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.outgoing.is_empty() && self.awaiting_response.is_empty()
    }

    /// Empty every queue
    pub fn clear(&mut self) {
        self.pending.clear();
        self.outgoing.clear();
        self.awaiting_response.clear();
        self.completed.clear();
        self.errored.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn outgoing_len(&self) -> usize {
        self.outgoing.len()
    }

    pub fn sizes(&self) -> QueueSizes {
        QueueSizes {
            pending: self.pending.len(),
            outgoing: self.outgoing.len(),
            awaiting_response: self.awaiting_response.len(),
            completed: self.completed.len(),
            errored: self.errored.len(),
        }
    }

    pub fn completed(&self) -> &[GcodeCommand] {
        &self.completed
    }

    pub fn errored(&self) -> &[GcodeCommand] {
        &self.errored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grblstream_core::{CommandNumberGenerator, CommandState};

    fn outgoing(gen: &CommandNumberGenerator, text: &str) -> GcodeCommand {
        let mut cmd = gen.command(text);
        cmd.mark_outgoing();
        cmd
    }

    #[test]
    fn test_ensure_idle() {
        let gen = CommandNumberGenerator::new();
        let mut queues = CommandQueues::new();
        queues.push_pending(gen.command("G0"));
        assert!(queues.ensure_idle().is_ok());

        queues.push_outgoing(outgoing(&gen, "G1"));
        assert_eq!(
            queues.ensure_idle(),
            Err(ControllerError::OutstandingCommands {
                outgoing: 1,
                awaiting: 0
            })
        );
    }

    #[test]
    fn test_send_then_acknowledge() {
        let gen = CommandNumberGenerator::new();
        let mut queues = CommandQueues::new();
        let first = outgoing(&gen, "G0 X1");
        let second = outgoing(&gen, "G0 X2");
        let (s1, s2) = (first.sequence(), second.sequence());
        queues.push_outgoing(first);
        queues.push_outgoing(second);

        let sent = queues.confirm_sent(s1).unwrap();
        assert_eq!(sent.state(), CommandState::AwaitingResponse);
        assert_eq!(queues.sizes().awaiting_response, 1);

        let done = queues.acknowledge("ok", false).unwrap();
        assert_eq!(done.sequence(), s1);
        assert_eq!(done.response(), Some("ok"));

        queues.confirm_sent(s2).unwrap();
        let failed = queues.acknowledge("error:20", true).unwrap();
        assert!(failed.is_error());

        assert!(queues.is_drained());
        assert_eq!(queues.completed().len(), 1);
        assert_eq!(queues.errored().len(), 1);
    }

    #[test]
    fn test_unexpected_callbacks_are_ignored() {
        let mut queues = CommandQueues::new();
        assert!(queues.confirm_sent(1).is_none());
        assert!(queues.acknowledge("ok", false).is_none());
        assert_eq!(queues.sizes(), QueueSizes::default());
    }

    #[test]
    fn test_clear() {
        let gen = CommandNumberGenerator::new();
        let mut queues = CommandQueues::new();
        queues.push_pending(gen.command("G0"));
        queues.push_outgoing(outgoing(&gen, "G1"));
        let mut skipped = gen.command("");
        skipped.mark_skipped();
        queues.complete_skipped(skipped);

        queues.clear();
        assert_eq!(queues.sizes(), QueueSizes::default());
        assert!(queues.ensure_idle().is_ok());
    }
}
