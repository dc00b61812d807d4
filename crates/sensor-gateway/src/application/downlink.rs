//! DownlinkTranslator: turns operator commands from the broker into sensor
//! frames and store updates.
//!
//! Only `<base>/node/<nodeId>/set/<sensorId>/mode` is acted on.  The frame is
//! written to the transport first, then the store is updated.  A failed write
//! is logged and the store is still updated: the sensor catches up the next
//! time it asks for its configuration.

use std::sync::Arc;

use sensor_gateway_core::protocol::MODE_SUBTOPIC;
use sensor_gateway_core::{CommandError, DownlinkFrame, ModeCommand, SensorConfig};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::gateway::GatewayContext;
use crate::application::GatewayError;

/// Why a broker message was not acted on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Ignored {
    #[error("topic is not a command topic for this node")]
    ForeignTopic,

    #[error("unhandled command subtopic {0:?}")]
    UnhandledSubtopic(String),

    #[error("payload is not UTF-8")]
    NotUtf8,

    #[error(transparent)]
    Payload(#[from] CommandError),
}

/// What a single translation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Translated {
    Ignored(Ignored),
    Applied(SensorConfig),
}

pub struct DownlinkTranslator {
    ctx: Arc<GatewayContext>,
}

impl DownlinkTranslator {
    pub fn new(ctx: Arc<GatewayContext>) -> Self {
        Self { ctx }
    }

    /// Handles one message delivered on the command subscription.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreUnavailable`] when the frame went out but
    /// the new configuration could not be persisted.  Nothing is rolled back.
    pub fn translate(&self, topic: &str, payload: &[u8]) -> Result<Translated, GatewayError> {
        let Some(target) = self.ctx.topics.parse_command_topic(topic) else {
            return Ok(Translated::Ignored(Ignored::ForeignTopic));
        };
        if target.subtopic != MODE_SUBTOPIC {
            return Ok(Translated::Ignored(Ignored::UnhandledSubtopic(target.subtopic)));
        }
        let Ok(text) = std::str::from_utf8(payload) else {
            return Ok(Translated::Ignored(Ignored::NotUtf8));
        };
        let command = match ModeCommand::parse(text) {
            Ok(command) => command,
            Err(e) => return Ok(Translated::Ignored(e.into())),
        };

        let frame = DownlinkFrame::new(target.sensor.clone(), command.downlink());
        if let Err(e) = self.ctx.transport.write_frame(&frame.to_string()) {
            warn!(%frame, "failed to send mode change, sensor will resync later: {e}");
        }

        let config = self.ctx.store.apply(&target.sensor, &command)?;
        info!(sensor = %target.sensor, mode = ?config.mode, "mode changed");
        Ok(Translated::Applied(config))
    }

    /// [`translate`](Self::translate) plus logging, for use in the broker
    /// event loop.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) {
        match self.translate(topic, payload) {
            Ok(Translated::Applied(_)) => {}
            Ok(Translated::Ignored(reason)) => debug!(topic, "ignored broker message: {reason}"),
            Err(e @ GatewayError::StoreUnavailable(_)) => error!(topic, "{e}"),
            Err(e) => warn!(topic, "{e}"),
        }
    }
}
