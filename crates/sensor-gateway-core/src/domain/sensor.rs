//! Sensor and node identity tokens.
//!
//! Every participant on the transport is addressed by a short alphanumeric
//! token.  Sensor units receive a token of the form `C` + 6 decimal digits
//! when they first identify themselves; the gateway's own node identity uses
//! the same token shape and doubles as its broker topic segment.
//!
//! A sensor that has not been provisioned yet speaks with the placeholder
//! token [`UNASSIGNED_SENSOR_ID`].

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix character of every generated sensor id.
pub const SENSOR_ID_PREFIX: char = 'C';

/// Number of random decimal digits following [`SENSOR_ID_PREFIX`].
pub const SENSOR_ID_DIGITS: usize = 6;

/// Placeholder id used by sensors that have not been provisioned.
pub const UNASSIGNED_SENSOR_ID: &str = "0000000";

/// Returned when a token is not a valid identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sensor id {0:?}: must be non-empty ASCII alphanumeric")]
pub struct InvalidSensorId(pub String);

/// An identity token: non-empty, ASCII alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SensorId(String);

impl SensorId {
    /// Validates `raw` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSensorId`] if `raw` is empty or contains anything
    /// other than ASCII letters and digits.
    pub fn parse(raw: &str) -> Result<Self, InvalidSensorId> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(InvalidSensorId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Generates a fresh sensor id: [`SENSOR_ID_PREFIX`] followed by
    /// [`SENSOR_ID_DIGITS`] random decimal digits.
    ///
    /// Uniqueness is not checked here; the store rejects collisions when the
    /// identity is registered.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut id = String::with_capacity(1 + SENSOR_ID_DIGITS);
        id.push(SENSOR_ID_PREFIX);
        for _ in 0..SENSOR_ID_DIGITS {
            let digit = rng.gen_range(0..10u32);
            id.push(char::from_digit(digit, 10).unwrap_or('0'));
        }
        Self(id)
    }

    /// The placeholder id used before provisioning.
    pub fn unassigned() -> Self {
        Self(UNASSIGNED_SENSOR_ID.to_string())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0 == UNASSIGNED_SENSOR_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SensorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SensorId {
    type Err = InvalidSensorId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SensorId {
    type Error = InvalidSensorId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SensorId> for String {
    fn from(id: SensorId) -> Self {
        id.0
    }
}

/// What an identity record describes.
///
/// Exactly one `Node` record exists per gateway; every other record is a
/// `Sensor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Node,
    Sensor,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKind::Node => f.write_str("node"),
            IdentityKind::Sensor => f.write_str("sensor"),
        }
    }
}
