//! Inbound (sensor → gateway) frame parser.
//!
//! Sensor units send one text line per frame:
//!
//! ```text
//! C123456:t:29.3     temperature reading
//! C123456:r:1        relay state report
//! C123456:G          resend my configuration
//! 0000000:I          give me an identity (placeholder id)
//! I                  give me an identity (bare form)
//! DEBUG: ...         firmware diagnostics, discarded
//! ```
//!
//! The parser is strict: every line either becomes an [`InboundLine`] or a
//! [`FrameError`] naming what was wrong.  Deciding that errors are ignored is
//! the dispatcher's policy, not an accident of missing branches here.

use thiserror::Error;

use crate::domain::sensor::SensorId;
use crate::protocol::{FIELD_SEPARATOR, MAX_FIELDS};

/// Any line containing this marker is firmware debug output.
pub const DIAGNOSTIC_MARKER: &str = "DEBUG: ";

/// Errors produced while parsing an inbound line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Nothing left after stripping the line terminator.
    #[error("empty frame")]
    Empty,

    /// The line does not have a recognised shape.
    #[error("malformed frame {frame:?}: {reason}")]
    Malformed { frame: String, reason: &'static str },

    /// The shape is valid but the command code is not one we handle.
    #[error("unknown command code {0:?}")]
    UnknownCommand(String),
}

impl FrameError {
    fn malformed(frame: &str, reason: &'static str) -> Self {
        FrameError::Malformed {
            frame: frame.to_string(),
            reason,
        }
    }
}

/// A command sent by a sensor unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Uplink {
    /// `I`: the sender wants a fresh identity.  `placeholder` is the id field
    /// the unit used (normally `0000000`), absent in the bare form.
    Identify { placeholder: Option<SensorId> },
    /// `G`: the sender wants its configuration resent.
    ResendConfig { sensor: SensorId },
    /// `t`: temperature reading, kept verbatim for publication.
    Temperature { sensor: SensorId, reading: String },
    /// `r`: relay state, `0` or `1`, kept verbatim for publication.
    Relay { sensor: SensorId, state: String },
}

/// Result of classifying one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// Firmware debug output; carries no command.
    Diagnostic,
    Command(Uplink),
}

/// Parses one inbound line.
///
/// Trailing CR/LF characters are stripped before parsing.  The identity and
/// resend commands ignore any arguments the firmware appends; telemetry and
/// relay reports take exactly one.
///
/// # Errors
///
/// Returns [`FrameError::Empty`] for blank lines, [`FrameError::Malformed`]
/// when the field layout or a value is invalid, and
/// [`FrameError::UnknownCommand`] for unrecognised command codes.
///
/// # Examples
///
/// ```rust
/// use sensor_gateway_core::protocol::frame::{parse_line, InboundLine, Uplink};
///
/// let line = parse_line("C123456:t:29.3\r\n").unwrap();
/// match line {
///     InboundLine::Command(Uplink::Temperature { sensor, reading }) => {
///         assert_eq!(sensor.as_str(), "C123456");
///         assert_eq!(reading, "29.3");
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn parse_line(line: &str) -> Result<InboundLine, FrameError> {
    let line = line.trim_end_matches(['\r', '\n']);

    if line.contains(DIAGNOSTIC_MARKER) {
        return Ok(InboundLine::Diagnostic);
    }
    if line.is_empty() {
        return Err(FrameError::Empty);
    }

    if !line.contains(FIELD_SEPARATOR) {
        return parse_bare(line);
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() > MAX_FIELDS {
        return Err(FrameError::malformed(line, "too many fields"));
    }

    let sensor =
        SensorId::parse(fields[0]).map_err(|_| FrameError::malformed(line, "invalid sensor id"))?;
    let code = fields[1];
    let args = &fields[2..];

    let uplink = match code {
        "I" => Uplink::Identify {
            placeholder: Some(sensor),
        },
        "G" => Uplink::ResendConfig { sensor },
        "t" => {
            let reading = single_arg(line, args)?;
            match reading.parse::<f64>() {
                Ok(v) if v.is_finite() => {}
                _ => return Err(FrameError::malformed(line, "temperature is not a number")),
            }
            Uplink::Temperature {
                sensor,
                reading: reading.to_string(),
            }
        }
        "r" => {
            let state = single_arg(line, args)?;
            if state != "0" && state != "1" {
                return Err(FrameError::malformed(line, "relay state must be 0 or 1"));
            }
            Uplink::Relay {
                sensor,
                state: state.to_string(),
            }
        }
        "" => return Err(FrameError::malformed(line, "missing command code")),
        other => return Err(FrameError::UnknownCommand(other.to_string())),
    };

    Ok(InboundLine::Command(uplink))
}

/// A line without any separator: only the identify command is legal.
fn parse_bare(line: &str) -> Result<InboundLine, FrameError> {
    match line {
        "I" => Ok(InboundLine::Command(Uplink::Identify { placeholder: None })),
        "G" | "t" | "r" => Err(FrameError::malformed(line, "command requires a sensor id")),
        other => Err(FrameError::UnknownCommand(other.to_string())),
    }
}

fn single_arg<'a>(line: &str, args: &[&'a str]) -> Result<&'a str, FrameError> {
    match args {
        [value] if !value.is_empty() => Ok(*value),
        [] | [_] => Err(FrameError::malformed(line, "missing value")),
        _ => Err(FrameError::malformed(line, "unexpected extra argument")),
    }
}
