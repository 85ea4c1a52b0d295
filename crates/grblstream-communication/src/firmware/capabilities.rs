//! Device capabilities
//!
//! What the connected firmware supports, negotiated once from its boot
//! banner and optionally refined by capability hints from the transport.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single capability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Accepts single-byte real-time commands (`!`, `~`, `?`)
    RealTime,
    /// Reports positions in the 0.8c/0.9 comma-separated status format
    PositionC,
    /// Reports positions in the 1.1 pipe-separated status format
    StatusV11,
}

impl Capability {
    /// Check if this tag describes a status report format
    pub fn is_position_mode(&self) -> bool {
        matches!(self, Self::PositionC | Self::StatusV11)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RealTime => write!(f, "real-time"),
            Self::PositionC => write!(f, "position-c"),
            Self::StatusV11 => write!(f, "status-v1.1"),
        }
    }
}

/// Negotiated capability set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityState {
    real_time: bool,
    position_mode: Option<Capability>,
}

impl CapabilityState {
    pub fn new(real_time: bool, position_mode: Option<Capability>) -> Self {
        debug_assert!(position_mode.is_none_or(|c| c.is_position_mode()));
        Self {
            real_time,
            position_mode,
        }
    }

    /// Record a capability reported by the transport
    pub fn apply(&mut self, capability: Capability) {
        match capability {
            Capability::RealTime => self.real_time = true,
            mode => self.position_mode = Some(mode),
        }
    }

    pub fn is_real_time_capable(&self) -> bool {
        self.real_time
    }

    /// Status report format, if the device reports positions at all
    pub fn position_mode(&self) -> Option<Capability> {
        self.position_mode
    }
}
