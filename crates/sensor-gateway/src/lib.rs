//! sensor-gateway library crate.
//!
//! Bridges a network of radio sensor units to an MQTT broker.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! sensor units (serial / TCP line protocol)
//!         ↕
//! [sensor-gateway]
//!   ├── application/        Use cases: CommandDispatcher, DownlinkTranslator,
//!   │                       transport poll loop, and the ports they talk through
//!   └── infrastructure/
//!         ├── storage/      Settings file and TOML sensor store
//!         ├── transport/    Serial port and TCP radio bridge adapters
//!         ├── broker/       rumqttc client and event loop
//!         └── platform      Hardware seed for the node identity
//!         ↕
//! MQTT broker
//! ```
//!
//! Wire formats and domain types come from `sensor-gateway-core`.

pub mod application;
pub mod infrastructure;
