//! # sensor-gateway-core
//!
//! Shared library for the sensor gateway containing the transport wire codec,
//! the broker topic layout, and the sensor domain entities.
//!
//! This crate performs no I/O.  It has no knowledge of serial ports, radio
//! chips, MQTT clients, or files; the `sensor-gateway` crate wires these
//! pieces to real collaborators.
//!
//! # Architecture overview
//!
//! The gateway sits between two worlds:
//!
//! ```text
//! sensor units  ──(colon-delimited text frames)──►  gateway  ──(MQTT topics)──►  broker
//!               ◄──────────(mode commands)─────────           ◄──(operator commands)──
//! ```
//!
//! - **`protocol`** – How text travels on the transport (`frame`, `downlink`)
//!   and how broker topics are laid out (`topics`).
//!
//! - **`domain`** – Sensor identities, the persisted per-sensor configuration
//!   record, and the operator mode commands that mutate it.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `sensor_gateway_core::SensorConfig` instead of the full module path.
pub use domain::command::{CommandError, ModeCommand};
pub use domain::config::{OperatingMode, SensorConfig};
pub use domain::sensor::{IdentityKind, InvalidSensorId, SensorId};
pub use protocol::downlink::{decode_downlink, DownlinkCommand, DownlinkFrame};
pub use protocol::frame::{parse_line, FrameError, InboundLine, Uplink};
pub use protocol::topics::{CommandTopic, SensorChannel, TopicLayout};
