//! GRBL firmware support
//!
//! Line preprocessing, response and status parsing, version negotiation,
//! error/alarm decoding, the command queue manager and the streaming
//! controller built on top of them.

pub mod controller;
pub mod error_decoder;
pub mod preprocess;
pub mod queues;
pub mod response_parser;
pub mod status_parser;
pub mod version;

pub use controller::{ControllerInput, GrblController};
pub use error_decoder::{decode_alarm, decode_error, format_alarm, format_error};
pub use preprocess::{override_speed, parse_comment, preprocess, remove_comment, Preprocessed};
pub use queues::{CommandQueues, QueueSizes};
pub use response_parser::GrblResponse;
pub use status_parser::parse_status_report;
pub use version::GrblVersion;
