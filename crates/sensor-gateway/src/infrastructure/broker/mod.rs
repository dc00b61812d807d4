//! Broker adapters.
//!
//! - [`mqtt`] – `rumqttc` client and event loop.
//! - [`mock`] – recording broker for tests.

pub mod mock;
pub mod mqtt;
