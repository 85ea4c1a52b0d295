//! # GrblStream
//!
//! Host-side streaming controller for GRBL CNC firmware:
//! - Command queueing with per-command lifecycle tracking
//! - Flow-controlled streaming with pause, resume and cancel
//! - Reconciliation of partial status reports into full snapshots
//!
//! ## Architecture
//!
//! GrblStream is organized as a workspace with multiple crates:
//!
//! 1. **grblstream-core** - Core types, status builder, command entity, listeners, errors
//! 2. **grblstream-communication** - Transport trait, GRBL protocol parsing, `GrblController`
//! 3. **grblstream-settings** - Configuration files
//! 4. **grblstream** - This facade plus the dry-run binary

pub use grblstream_communication::firmware;
pub use grblstream_core::data;

pub use grblstream_core::{
    CommandNumberGenerator, CommandState, ConnectionError, ControllerError, ControllerEvent,
    ControllerListener, ControllerStatus, Error, EventDispatcher, FirmwareError, GcodeCommand,
    ListenerHandle, MachineState, Position, Result, StatusBuilder, StatusPatch, Units,
};

pub use grblstream_communication::{
    Capability, CapabilityState, ControllerInput, GrblController, GrblResponse, GrblVersion,
    LoopbackHandle, LoopbackTransport, NoOpTransport, QueueSizes, Transport,
};

pub use grblstream_settings::{Config, ConnectionSettings, SettingsError, StreamingSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
