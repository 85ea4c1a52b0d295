//! # GrblStream Communication
//!
//! GRBL protocol handling and the streaming controller.
//! The transport itself (serial port, TCP bridge, ...) lives outside this
//! crate behind the [`Transport`] trait; everything above the byte channel
//! lives here: response classification, status report parsing, boot banner
//! negotiation, line preprocessing, the command queues and
//! [`GrblController`].

pub mod communication;
pub mod firmware;

pub use communication::{
    loopback::{LoopbackHandle, LoopbackTransport},
    NoOpTransport, Transport, PAUSE_COMMAND, RESUME_COMMAND,
};

pub use firmware::{
    capabilities::{Capability, CapabilityState},
    grbl::{
        controller::{ControllerInput, GrblController},
        queues::{CommandQueues, QueueSizes},
        response_parser::GrblResponse,
        version::GrblVersion,
    },
};
