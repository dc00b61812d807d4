//! Operator mode commands.
//!
//! Operators change a sensor's behaviour by publishing a short text payload to
//! `<base>/node/<nodeId>/set/<sensorId>/mode`.  Four payload forms exist:
//!
//! | Payload                      | Command                               |
//! |------------------------------|---------------------------------------|
//! | `override relay on`          | [`ModeCommand::RelayOverride`] on     |
//! | `override relay off`         | [`ModeCommand::RelayOverride`] off    |
//! | `report`                     | [`ModeCommand::ReportOnly`]           |
//! | `automatic <upper> <lower>`  | [`ModeCommand::Automatic`]            |
//!
//! Matching is exact and case-sensitive: the operator UI always sends these
//! literal strings.  Anything else is rejected with a [`CommandError`], which
//! the gateway treats as "ignore".

use thiserror::Error;

use crate::domain::config::OperatingMode;
use crate::protocol::downlink::DownlinkCommand;

/// Why an operator payload was not accepted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// The payload matches none of the four command forms.
    #[error("unrecognised mode command {0:?}")]
    Unrecognised(String),

    /// An `automatic` bound is not a finite number.
    #[error("invalid threshold {0:?} in automatic command")]
    InvalidBound(String),
}

/// A mode change requested by an operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeCommand {
    RelayOverride { on: bool },
    ReportOnly,
    Automatic { upper: f64, lower: f64 },
}

impl ModeCommand {
    /// Parses an operator payload.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Unrecognised`] for payloads outside the four
    /// forms and [`CommandError::InvalidBound`] for non-numeric or non-finite
    /// thresholds.
    pub fn parse(payload: &str) -> Result<Self, CommandError> {
        match payload {
            "override relay on" => return Ok(ModeCommand::RelayOverride { on: true }),
            "override relay off" => return Ok(ModeCommand::RelayOverride { on: false }),
            "report" => return Ok(ModeCommand::ReportOnly),
            _ => {}
        }

        let tokens: Vec<&str> = payload.split(' ').collect();
        match tokens.as_slice() {
            ["automatic", upper, lower] => Ok(ModeCommand::Automatic {
                upper: parse_bound(upper)?,
                lower: parse_bound(lower)?,
            }),
            _ => Err(CommandError::Unrecognised(payload.to_string())),
        }
    }

    /// The operating mode this command switches to.
    pub fn mode(&self) -> OperatingMode {
        match self {
            ModeCommand::RelayOverride { on: true } => OperatingMode::OverrideOn,
            ModeCommand::RelayOverride { on: false } => OperatingMode::OverrideOff,
            ModeCommand::ReportOnly => OperatingMode::ReportOnly,
            ModeCommand::Automatic { .. } => OperatingMode::Automatic,
        }
    }

    /// The transport command carrying this change to the sensor.
    pub fn downlink(&self) -> DownlinkCommand {
        match *self {
            ModeCommand::RelayOverride { on } => DownlinkCommand::RelayOverride(on),
            ModeCommand::ReportOnly => DownlinkCommand::ReportOnly,
            ModeCommand::Automatic { upper, lower } => DownlinkCommand::Automatic { upper, lower },
        }
    }
}

fn parse_bound(token: &str) -> Result<f64, CommandError> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CommandError::InvalidBound(token.to_string())),
    }
}
