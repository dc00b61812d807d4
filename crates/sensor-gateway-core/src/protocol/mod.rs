//! Protocol module: transport frame codec and broker topic layout.
//!
//! Wire format (both directions):
//! ```text
//! <sensorId>:<commandCode>[:<arg1>[:<arg2>]]
//! ```

pub mod downlink;
pub mod frame;
pub mod topics;

pub use downlink::{decode_downlink, format_bound, DownlinkCommand, DownlinkFrame};
pub use frame::{parse_line, FrameError, InboundLine, Uplink, DIAGNOSTIC_MARKER};
pub use topics::{CommandTopic, SensorChannel, TopicLayout, MODE_SUBTOPIC};

/// Separator between the fields of a frame.
pub const FIELD_SEPARATOR: char = ':';

/// Maximum number of fields in a frame: id, code, and two arguments.
pub const MAX_FIELDS: usize = 4;
