//! Line transport over any byte stream.
//!
//! Reading happens on a dedicated OS thread, because both serial ports and
//! std sockets block.  The thread splits the stream on `\n`, keeps only
//! printable ASCII (radio links deliver the odd corrupted byte), and forwards
//! each non-empty line over a Tokio channel with `blocking_send`.
//! [`Transport::try_read_frame`] then just drains that channel.
//!
//! The thread ends on end-of-stream, on a hard read error, or once the
//! transport is dropped.

use std::io::{ErrorKind, Read, Write};
use std::sync::Mutex;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, warn};

use crate::application::ports::{Transport, TransportError};

/// Lines buffered between the reader thread and the poll loop.
const LINE_CHANNEL_CAPACITY: usize = 256;

const READ_CHUNK: usize = 256;

/// Longest line kept.  Longer runs without `\n` are noise and are dropped
/// up to the next newline.
const MAX_LINE_LEN: usize = 256;

/// A [`Transport`] made of a blocking reader (moved to a background thread)
/// and a blocking writer guarded by a mutex.
pub struct StreamTransport<W: Write + Send> {
    writer: Mutex<W>,
    lines: Mutex<mpsc::Receiver<String>>,
    terminator: String,
}

impl<W: Write + Send> StreamTransport<W> {
    /// Starts the reader thread.  `label` names the thread and its log lines.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the thread cannot be spawned.
    pub fn start<R>(label: &str, reader: R, writer: W, terminator: &str) -> Result<Self, TransportError>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let thread_label = label.to_string();
        std::thread::Builder::new()
            .name(format!("{label}-reader"))
            .spawn(move || read_lines(&thread_label, reader, tx))?;

        Ok(Self {
            writer: Mutex::new(writer),
            lines: Mutex::new(rx),
            terminator: terminator.to_string(),
        })
    }
}

impl<W: Write + Send> Transport for StreamTransport<W> {
    fn try_read_frame(&self) -> Result<Option<String>, TransportError> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| TransportError::Io(std::io::Error::other("reader lock poisoned")))?;
        match lines.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn write_frame(&self, frame: &str) -> Result<(), TransportError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TransportError::Io(std::io::Error::other("writer lock poisoned")))?;
        writer.write_all(frame.as_bytes())?;
        writer.write_all(self.terminator.as_bytes())?;
        writer.flush()?;
        debug!(frame, "frame sent");
        Ok(())
    }
}

/// Reader thread body.
fn read_lines<R: Read>(label: &str, mut reader: R, tx: mpsc::Sender<String>) {
    let mut splitter = LineSplitter::default();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => {
                warn!("{label}: end of stream");
                return;
            }
            Ok(n) => n,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("{label}: read failed: {e}");
                return;
            }
        };

        for line in splitter.push(&buf[..n]) {
            if tx.blocking_send(line).is_err() {
                debug!("{label}: transport dropped, reader exiting");
                return;
            }
        }
    }
}

/// Returns `true` for the errors a read timeout produces on each platform.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Accumulates bytes and yields complete, printable lines.
#[derive(Default)]
struct LineSplitter {
    pending: String,
    overlong: bool,
}

impl LineSplitter {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut complete = Vec::new();
        for &b in bytes {
            match b {
                b'\n' => {
                    if self.overlong {
                        warn!("dropped a line longer than {MAX_LINE_LEN} bytes");
                        self.overlong = false;
                    } else if !self.pending.is_empty() {
                        complete.push(std::mem::take(&mut self.pending));
                    }
                }
                _ if self.overlong => {}
                0x20..=0x7e if self.pending.len() == MAX_LINE_LEN => {
                    self.pending.clear();
                    self.overlong = true;
                }
                0x20..=0x7e => self.pending.push(char::from(b)),
                _ => {}
            }
        }
        complete
    }
}
