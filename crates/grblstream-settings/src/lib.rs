//! GrblStream Settings Crate
//!
//! Handles configuration files: the serial connection to open and the
//! streaming options applied to the controller.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, StreamingSettings};
pub use error::{SettingsError, SettingsResult};
