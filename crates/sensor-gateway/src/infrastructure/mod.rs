//! Infrastructure layer: adapters for the ports in `application::ports`.
//!
//! - [`storage`] – settings file and TOML sensor store.
//! - [`transport`] – serial and TCP line transports.
//! - [`broker`] – MQTT client and event loop.
//! - [`platform`] – hardware seed for the node identity.

pub mod broker;
pub mod platform;
pub mod storage;
pub mod transport;
