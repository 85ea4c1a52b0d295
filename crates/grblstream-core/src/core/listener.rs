//! Controller listener interface
//!
//! Defines the observer trait the streaming controller notifies and the
//! registry that owns registered observers. Every method has a no-op
//! default so implementors only override what they care about.

use crate::command::GcodeCommand;
use crate::data::ControllerStatus;
use std::sync::Arc;
use uuid::Uuid;

/// Handle for a registered controller listener.
///
/// Returned by [`ListenerRegistry::add`]; pass it back to
/// [`ListenerRegistry::remove`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub Uuid);

impl ListenerHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listener trait for controller events
///
/// Calls are made synchronously, after the controller has released its
/// queue lock, so an implementation may call back into the controller from
/// the calling thread. Other threads wait until delivery finishes.
pub trait ControllerListener: Send + Sync {
    /// A command was accepted into the pending queue
    fn command_queued(&self, _command: &GcodeCommand) {}

    /// A command left the host (or was skipped)
    fn command_sent(&self, _command: &GcodeCommand) {}

    /// A command was acknowledged (or was skipped)
    fn command_completed(&self, _command: &GcodeCommand) {}

    /// A comment was stripped from a line during preprocessing
    fn command_comment(&self, _comment: &str) {}

    /// Informational text for a console view
    fn message_for_console(&self, _message: &str, _verbose: bool) {}

    /// A new status snapshot was built from a device report
    fn status_update(&self, _status: &ControllerStatus) {}

    /// Every line of a job has been acknowledged
    fn stream_complete(&self, _filename: Option<&str>, _success: bool) {}
}

/// Ordered set of registered listeners
///
/// Dispatch follows registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<(ListenerHandle, Arc<dyn ControllerListener>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, returning the handle used to remove it
    pub fn add(&mut self, listener: Arc<dyn ControllerListener>) -> ListenerHandle {
        let handle = ListenerHandle::new();
        self.entries.push((handle, listener));
        handle
    }

    /// Unregister a listener. Returns false if the handle was unknown.
    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(h, _)| *h != handle);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone out the current listeners so they can be called without
    /// holding whatever lock guards the registry
    pub fn snapshot(&self) -> Vec<Arc<dyn ControllerListener>> {
        self.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}
