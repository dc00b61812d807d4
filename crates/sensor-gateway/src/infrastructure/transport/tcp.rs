//! Network-attached radio bridge: the same line protocol over a TCP socket.

use std::net::TcpStream;
use std::time::Duration;

use tracing::info;

use crate::application::ports::TransportError;
use crate::infrastructure::transport::stream::StreamTransport;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_millis(100);

pub type TcpTransport = StreamTransport<TcpStream>;

/// Connects to `addr` (`host:port`) and starts the reader thread.
///
/// # Errors
///
/// Returns [`TransportError::Open`] if the address does not resolve or the
/// connection is refused.
pub fn connect_tcp(addr: &str, terminator: &str) -> Result<TcpTransport, TransportError> {
    let open_error = |reason: String| TransportError::Open {
        target: addr.to_string(),
        reason,
    };

    let socket_addr = std::net::ToSocketAddrs::to_socket_addrs(addr)
        .map_err(|e| open_error(e.to_string()))?
        .next()
        .ok_or_else(|| open_error("address did not resolve".to_string()))?;
    let stream = TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT)
        .map_err(|e| open_error(e.to_string()))?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let reader = stream.try_clone()?;

    info!("connected to radio bridge at {socket_addr}");
    StreamTransport::start("tcp", reader, stream, terminator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::time::Instant;

    use crate::application::ports::Transport;

    #[test]
    fn test_round_trip_over_loopback() {
        // Arrange: a fake radio bridge
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let bridge = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"C123456:t:29.3\r\n").unwrap();
            let mut reply = String::new();
            BufReader::new(sock).read_line(&mut reply).unwrap();
            reply
        });

        // Act
        let transport = connect_tcp(&addr, "\n").unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        let line = loop {
            if let Some(line) = transport.try_read_frame().unwrap() {
                break line;
            }
            assert!(Instant::now() < deadline, "no line received");
            std::thread::sleep(Duration::from_millis(5));
        };
        transport.write_frame("C123456:SMR").unwrap();

        // Assert
        assert_eq!(line, "C123456:t:29.3");
        assert_eq!(bridge.join().unwrap(), "C123456:SMR\n");
    }

    #[test]
    fn test_unresolvable_address_is_open_error() {
        assert!(matches!(
            connect_tcp("not an address", "\n"),
            Err(TransportError::Open { .. })
        ));
    }
}
