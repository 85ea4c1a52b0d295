//! # GrblStream Core
//!
//! Core types, traits, and utilities for GrblStream.
//! Provides the command lifecycle entity, the machine status snapshot and
//! the builder that reconciles partial device reports, the controller
//! listener contract, and the shared error taxonomy.

pub mod command;
pub mod core;
pub mod data;
pub mod error;

pub use command::{CommandNumberGenerator, CommandState, GcodeCommand, SKIPPED_RESPONSE};

pub use core::{
    event::{ControllerEvent, EventDispatcher},
    listener::{ControllerListener, ListenerHandle, ListenerRegistry},
};

pub use data::{
    status::{FeedSpeed, Field, ResolvedStatus, StatusBuilder, StatusPatch},
    AccessoryStates, ControllerStatus, EnabledPins, MachineState, OverridePercents, Position,
    Units,
};

pub use error::{ConnectionError, ControllerError, Error, FirmwareError, Result};
