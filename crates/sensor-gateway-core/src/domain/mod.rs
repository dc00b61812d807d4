//! Domain entities for the sensor gateway.
//!
//! - **`sensor`** – Identity tokens and the node/sensor identity kinds.
//! - **`config`** – The per-sensor configuration record the gateway persists.
//! - **`command`** – Operator mode commands received from the broker.

pub mod command;
pub mod config;
pub mod sensor;
