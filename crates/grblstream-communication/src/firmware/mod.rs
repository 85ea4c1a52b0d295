//! Firmware support
//!
//! - [`capabilities`]: what a connected device can do
//! - [`grbl`]: the GRBL protocol and streaming controller

pub mod capabilities;
pub mod grbl;
