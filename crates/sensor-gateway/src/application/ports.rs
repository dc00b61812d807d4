//! Ports: the seams between the gateway's use cases and the outside world.
//!
//! Each trait here has one production adapter in `infrastructure` and one
//! in-memory double used by tests.

use async_trait::async_trait;
use sensor_gateway_core::{IdentityKind, InvalidSensorId, ModeCommand, SensorConfig, SensorId};
use thiserror::Error;

// ── Transport ─────────────────────────────────────────────────────────────────

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device or socket could not be opened.
    #[error("failed to open transport {target}: {reason}")]
    Open { target: String, reason: String },

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reader side has stopped; no more frames will arrive.
    #[error("transport closed")]
    Closed,
}

/// A line-oriented, bidirectional link to the sensor network.
pub trait Transport: Send + Sync {
    /// Returns the next complete inbound line, or `None` when nothing is
    /// waiting.  Never blocks.
    fn try_read_frame(&self) -> Result<Option<String>, TransportError>;

    /// Sends one frame.  The adapter appends its line terminator; concurrent
    /// callers never see their frames interleaved.
    fn write_frame(&self, frame: &str) -> Result<(), TransportError>;
}

// ── Broker ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Outbound side of the message broker.
///
/// Inbound delivery is push-based: the broker adapter's event loop calls the
/// [`DownlinkTranslator`](crate::application::downlink::DownlinkTranslator).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BrokerError>;
}

// ── Config store ──────────────────────────────────────────────────────────────

/// Error type for sensor store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The id is already recorded (with the given kind).
    #[error("identity {id} already exists as {existing}")]
    DuplicateIdentity { id: SensorId, existing: IdentityKind },

    /// A seed or id could not be turned into a valid identity token.
    #[error(transparent)]
    InvalidIdentity(#[from] InvalidSensorId),

    /// The backing storage could not be read or written.
    #[error("sensor store unavailable: {0}")]
    Unavailable(String),
}

/// Durable record of sensor identities and their configurations.
///
/// Implementations serialize all access; every method is atomic with respect
/// to every other.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigStore: Send + Sync {
    /// Returns the stored config, creating and persisting the default (and
    /// the sensor identity) when none exists.
    fn get_or_create(&self, id: &SensorId) -> Result<SensorConfig, StoreError>;

    /// Overwrites the config for `config.sensor_id`.
    fn save(&self, config: &SensorConfig) -> Result<(), StoreError>;

    /// Records an identity.  Idempotent for the same kind; a sensor identity
    /// gets a default config if it has none.
    fn create_identity(&self, id: &SensorId, kind: IdentityKind) -> Result<(), StoreError>;

    /// Records a brand-new sensor with the default config.
    ///
    /// Fails with [`StoreError::DuplicateIdentity`] if the id is known in any
    /// role; an existing config is never replaced.
    fn register_sensor(&self, id: &SensorId) -> Result<SensorConfig, StoreError>;

    /// Reads, updates, and persists one sensor's config as a single step.
    fn apply(&self, id: &SensorId, command: &ModeCommand) -> Result<SensorConfig, StoreError>;

    /// The gateway's own identity.  Created from `seed` on first call; later
    /// calls return the stored identity and ignore `seed`.
    fn node_identity(&self, seed: &str) -> Result<SensorId, StoreError>;

    /// All provisioned sensor ids, in ascending order.
    fn sensors(&self) -> Result<Vec<SensorId>, StoreError>;
}
