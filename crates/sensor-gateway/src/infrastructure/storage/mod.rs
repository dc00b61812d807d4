//! Storage infrastructure: the process settings file and the sensor store.
//!
//! Both are TOML documents.  `settings` is read once at startup; `sensor_store`
//! is rewritten on every configuration change.

pub mod sensor_store;
pub mod settings;
