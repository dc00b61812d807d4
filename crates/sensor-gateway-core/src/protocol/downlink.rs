//! Outbound (gateway → sensor) command frames.
//!
//! ```text
//! 0000000:SIC123456        assign identity C123456 to the unit asking for one
//! C123456:SMO1             relay override on
//! C123456:SMO0             relay override off
//! C123456:SMR              report-only mode
//! C123456:SMA:30.00:25.00  automatic mode, upper then lower bound
//! ```
//!
//! Bounds are rendered with [`format_bound`]: zero-padded to a fixed width of
//! five characters with two fractional digits, which is the layout the sensor
//! firmware reads by position.

use std::fmt;

use crate::domain::sensor::SensorId;
use crate::protocol::frame::FrameError;
use crate::protocol::{FIELD_SEPARATOR, MAX_FIELDS};

const ASSIGN_IDENTITY: &str = "SI";
const OVERRIDE_ON: &str = "SMO1";
const OVERRIDE_OFF: &str = "SMO0";
const REPORT_ONLY: &str = "SMR";
const AUTOMATIC: &str = "SMA";

/// A command for a sensor unit, without its address.
#[derive(Debug, Clone, PartialEq)]
pub enum DownlinkCommand {
    AssignIdentity(SensorId),
    RelayOverride(bool),
    ReportOnly,
    Automatic { upper: f64, lower: f64 },
}

impl fmt::Display for DownlinkCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownlinkCommand::AssignIdentity(id) => write!(f, "{ASSIGN_IDENTITY}{id}"),
            DownlinkCommand::RelayOverride(true) => f.write_str(OVERRIDE_ON),
            DownlinkCommand::RelayOverride(false) => f.write_str(OVERRIDE_OFF),
            DownlinkCommand::ReportOnly => f.write_str(REPORT_ONLY),
            DownlinkCommand::Automatic { upper, lower } => write!(
                f,
                "{AUTOMATIC}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
                format_bound(*upper),
                format_bound(*lower)
            ),
        }
    }
}

/// A complete outbound frame: target address plus command.
///
/// `Display` produces the exact wire text (without line terminator).
#[derive(Debug, Clone, PartialEq)]
pub struct DownlinkFrame {
    pub target: SensorId,
    pub command: DownlinkCommand,
}

impl DownlinkFrame {
    pub fn new(target: SensorId, command: DownlinkCommand) -> Self {
        Self { target, command }
    }
}

impl fmt::Display for DownlinkFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FIELD_SEPARATOR}{}", self.target, self.command)
    }
}

/// Renders a threshold in the fixed-width layout the firmware expects.
///
/// ```rust
/// use sensor_gateway_core::protocol::downlink::format_bound;
///
/// assert_eq!(format_bound(30.0), "30.00");
/// assert_eq!(format_bound(5.5), "05.50");
/// ```
pub fn format_bound(value: f64) -> String {
    format!("{value:05.2}")
}

/// Decodes an outbound frame back into its parts.
///
/// The gateway never receives these frames; decoding exists so that tools and
/// tests can read back exactly what was put on the wire.
///
/// # Errors
///
/// Returns [`FrameError`] when the text is not a well-formed downlink frame.
pub fn decode_downlink(frame: &str) -> Result<DownlinkFrame, FrameError> {
    let frame = frame.trim_end_matches(['\r', '\n']);
    if frame.is_empty() {
        return Err(FrameError::Empty);
    }

    let fields: Vec<&str> = frame.split(FIELD_SEPARATOR).collect();
    if fields.len() < 2 {
        return Err(malformed(frame, "missing command"));
    }
    if fields.len() > MAX_FIELDS {
        return Err(malformed(frame, "too many fields"));
    }

    let target = SensorId::parse(fields[0]).map_err(|_| malformed(frame, "invalid target id"))?;
    let code = fields[1];
    let args = &fields[2..];

    let command = match (code, args) {
        (OVERRIDE_ON, []) => DownlinkCommand::RelayOverride(true),
        (OVERRIDE_OFF, []) => DownlinkCommand::RelayOverride(false),
        (REPORT_ONLY, []) => DownlinkCommand::ReportOnly,
        (AUTOMATIC, [upper, lower]) => DownlinkCommand::Automatic {
            upper: decode_bound(frame, upper)?,
            lower: decode_bound(frame, lower)?,
        },
        (AUTOMATIC, _) => return Err(malformed(frame, "automatic mode needs two bounds")),
        (code, []) if code.starts_with(ASSIGN_IDENTITY) => {
            let id = SensorId::parse(&code[ASSIGN_IDENTITY.len()..])
                .map_err(|_| malformed(frame, "invalid assigned id"))?;
            DownlinkCommand::AssignIdentity(id)
        }
        (OVERRIDE_ON | OVERRIDE_OFF | REPORT_ONLY, _) => {
            return Err(malformed(frame, "unexpected argument"))
        }
        (other, _) => return Err(FrameError::UnknownCommand(other.to_string())),
    };

    Ok(DownlinkFrame { target, command })
}

fn decode_bound(frame: &str, token: &str) -> Result<f64, FrameError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(frame, "bound is not a number"))
}

fn malformed(frame: &str, reason: &'static str) -> FrameError {
    FrameError::Malformed {
        frame: frame.to_string(),
        reason,
    }
}
