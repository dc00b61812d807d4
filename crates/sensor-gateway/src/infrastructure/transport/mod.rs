//! Transport adapters: how lines reach and leave the sensor network.
//!
//! - [`serial`] – radio transceiver on a serial port (the usual setup).
//! - [`tcp`] – network-attached radio bridge.
//! - [`mock`] – in-memory transport for tests.
//!
//! Serial and TCP share the background line reader in [`stream`].

pub mod mock;
pub mod serial;
pub mod stream;
pub mod tcp;

use std::sync::Arc;

use crate::application::ports::{Transport, TransportError};
use crate::infrastructure::storage::settings::{TransportKind, TransportSettings};

/// Opens the transport selected in the settings.
///
/// # Errors
///
/// Returns [`TransportError::Open`] if the device or address is unreachable.
pub fn open_transport(settings: &TransportSettings) -> Result<Arc<dyn Transport>, TransportError> {
    let transport: Arc<dyn Transport> = match settings.kind {
        TransportKind::Serial => Arc::new(serial::open_serial(
            &settings.serial_port,
            settings.baud_rate,
            &settings.frame_terminator,
        )?),
        TransportKind::Tcp => Arc::new(tcp::connect_tcp(
            &settings.tcp_addr,
            &settings.frame_terminator,
        )?),
    };
    Ok(transport)
}
