//! Controller event contract
//!
//! - [`listener`]: the synchronous observer trait and its ordered registry
//! - [`event`]: owned event values and the broadcast bridge for async consumers

pub mod event;
pub mod listener;
