//! Recording broker for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::application::ports::{Broker, BrokerError};

/// Records every publication as a `(topic, payload)` pair.
#[derive(Default)]
pub struct RecordingBroker {
    published: Mutex<Vec<(String, String)>>,
    should_fail: AtomicBool,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `publish` fails and records nothing.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BrokerError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("injected failure".to_string()));
        }
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}
