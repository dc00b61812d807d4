//! Serial-attached radio transceiver.

use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::application::ports::TransportError;
use crate::infrastructure::transport::stream::StreamTransport;

/// How long a read blocks before the reader thread re-checks its channel.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

pub type SerialTransport = StreamTransport<Box<dyn SerialPort>>;

/// Opens `path` at 8N1 with no flow control and starts the reader thread on
/// a cloned handle.
///
/// # Errors
///
/// Returns [`TransportError::Open`] if the port cannot be opened or cloned.
pub fn open_serial(
    path: &str,
    baud_rate: u32,
    terminator: &str,
) -> Result<SerialTransport, TransportError> {
    let open_error = |e: serialport::Error| TransportError::Open {
        target: path.to_string(),
        reason: e.to_string(),
    };

    let port = serialport::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(open_error)?;
    let reader = port.try_clone().map_err(open_error)?;

    info!("opened serial port {path} at {baud_rate} baud");
    StreamTransport::start("serial", reader, port, terminator)
}
