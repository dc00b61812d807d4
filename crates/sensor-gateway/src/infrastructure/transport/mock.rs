//! In-memory transport for tests.
//!
//! Lines queued with [`MockTransport::inject_line`] are returned by
//! `try_read_frame` in order; written frames are recorded without
//! terminators.  After [`MockTransport::close`], an empty queue reports
//! [`TransportError::Closed`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::application::ports::{Transport, TransportError};

#[derive(Default)]
pub struct MockTransport {
    inbound: Mutex<VecDeque<String>>,
    written: Mutex<Vec<String>>,
    closed: AtomicBool,
    should_fail: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_line(&self, line: &str) {
        self.inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(line.to_string());
    }

    /// Marks the end of input.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// When set, every `write_frame` fails and records nothing.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<String> {
        self.written.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_written(&self) {
        self.written.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Transport for MockTransport {
    fn try_read_frame(&self) -> Result<Option<String>, TransportError> {
        let next = self
            .inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(line) => Ok(Some(line)),
            None if self.closed.load(Ordering::SeqCst) => Err(TransportError::Closed),
            None => Ok(None),
        }
    }

    fn write_frame(&self, frame: &str) -> Result<(), TransportError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::other("injected failure")));
        }
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(frame.to_string());
        Ok(())
    }
}
