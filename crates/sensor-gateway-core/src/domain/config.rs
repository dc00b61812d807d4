//! The per-sensor configuration record.
//!
//! A [`SensorConfig`] is the gateway's authoritative copy of how a sensor
//! unit should behave.  The sensor keeps its own copy in RAM; after a reboot
//! it asks the gateway to resend it (the `G` command), and the gateway answers
//! with [`SensorConfig::sync_command`].
//!
//! # Operating modes
//!
//! ```text
//! Automatic    relay driven by the sensor itself, between lower and upper bound
//! OverrideOn   relay forced on
//! OverrideOff  relay forced off
//! ReportOnly   telemetry only, relay untouched
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::command::ModeCommand;
use crate::domain::sensor::SensorId;
use crate::protocol::downlink::DownlinkCommand;

/// Lower threshold assigned to a newly provisioned sensor.
pub const DEFAULT_LOWER_BOUND: f64 = 26.0;

/// Upper threshold assigned to a newly provisioned sensor.
pub const DEFAULT_UPPER_BOUND: f64 = 32.0;

/// Control policy of a sensor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Automatic,
    OverrideOn,
    OverrideOff,
    ReportOnly,
}

impl OperatingMode {
    /// Single-letter mode code used in provisioning announcements.
    ///
    /// Both override variants share `O`; the relay flag tells them apart.
    pub fn code(self) -> char {
        match self {
            OperatingMode::Automatic => 'A',
            OperatingMode::OverrideOn | OperatingMode::OverrideOff => 'O',
            OperatingMode::ReportOnly => 'R',
        }
    }

    /// Whether this mode forces the relay on.
    pub fn relay_on(self) -> bool {
        matches!(self, OperatingMode::OverrideOn)
    }
}

/// Persisted configuration of one sensor unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub sensor_id: SensorId,
    pub mode: OperatingMode,
    pub relay_on: bool,
    /// Meaningful only in [`OperatingMode::Automatic`].
    pub lower_bound: f64,
    /// Meaningful only in [`OperatingMode::Automatic`].
    pub upper_bound: f64,
}

impl SensorConfig {
    /// The configuration every sensor starts with: automatic mode between
    /// [`DEFAULT_LOWER_BOUND`] and [`DEFAULT_UPPER_BOUND`], relay off.
    pub fn new_default(sensor_id: SensorId) -> Self {
        Self {
            sensor_id,
            mode: OperatingMode::Automatic,
            relay_on: false,
            lower_bound: DEFAULT_LOWER_BOUND,
            upper_bound: DEFAULT_UPPER_BOUND,
        }
    }

    /// Applies an operator command.
    ///
    /// Override and report commands leave the stored bounds untouched so that
    /// switching back to automatic without new bounds is never needed.  An
    /// automatic command stores its bounds exactly as given, even when
    /// `lower >= upper`.
    pub fn apply(&mut self, command: &ModeCommand) {
        self.mode = command.mode();
        self.relay_on = self.mode.relay_on();
        if let ModeCommand::Automatic { upper, lower } = *command {
            self.upper_bound = upper;
            self.lower_bound = lower;
        }
    }

    /// The downlink command that brings a sensor in line with this record.
    pub fn sync_command(&self) -> DownlinkCommand {
        match self.mode {
            OperatingMode::Automatic => DownlinkCommand::Automatic {
                upper: self.upper_bound,
                lower: self.lower_bound,
            },
            OperatingMode::OverrideOn => DownlinkCommand::RelayOverride(true),
            OperatingMode::OverrideOff => DownlinkCommand::RelayOverride(false),
            OperatingMode::ReportOnly => DownlinkCommand::ReportOnly,
        }
    }

    /// Provisioning announcement payload published to the broker, e.g.
    /// `id:C123456;op_mode:A;lower:26.0;upper:32.0;status:0`.
    pub fn announcement(&self) -> String {
        format!(
            "id:{};op_mode:{};lower:{};upper:{};status:{}",
            self.sensor_id,
            self.mode.code(),
            format_reading(self.lower_bound),
            format_reading(self.upper_bound),
            u8::from(self.relay_on),
        )
    }
}

/// Renders a threshold for human-facing payloads: whole numbers keep one
/// fractional digit (`26.0`), everything else is printed in full (`28.25`).
fn format_reading(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
