//! Application layer: the gateway's use cases.
//!
//! - [`dispatcher`] handles lines arriving from the sensor network.
//! - [`downlink`] handles operator commands arriving from the broker.
//! - [`gateway`] holds the shared context and the transport poll loop.
//!
//! Nothing here touches a device, a socket, or a file directly; all I/O goes
//! through the traits in [`ports`].

pub mod dispatcher;
pub mod downlink;
pub mod gateway;
pub mod ports;

use sensor_gateway_core::SensorId;
use thiserror::Error;

use ports::{StoreError, TransportError};

/// Error returned by a single dispatch or translation step.
///
/// None of these are fatal; the loops log them and move on.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A freshly generated id collided with a stored one.  The sensor will
    /// ask again.
    #[error("sensor id {0} is already provisioned")]
    DuplicateIdentity(SensorId),

    #[error("sensor store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("transport write failed: {0}")]
    Transport(#[from] TransportError),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateIdentity { id, .. } => GatewayError::DuplicateIdentity(id),
            other => GatewayError::StoreUnavailable(other),
        }
    }
}
