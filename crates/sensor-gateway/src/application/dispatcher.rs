//! CommandDispatcher: turns lines from the sensor network into broker
//! publications, store updates, and replies.
//!
//! Every line takes exactly one path:
//!
//! | Line                 | Effect                                                  |
//! |----------------------|---------------------------------------------------------|
//! | `DEBUG: ...`         | nothing                                                 |
//! | `<placeholder>:I`    | new id registered, `SI<id>` sent, announcement published |
//! | `<id>:G`             | stored config (or the default) sent back after a pause   |
//! | `<id>:t:<value>`     | value published to `.../sensor/<id>/temperature`         |
//! | `<id>:r:<0/1>`       | value published to `.../sensor/<id>/relay`               |
//! | anything else        | nothing                                                 |
//!
//! Unparseable lines are reported as [`Dispatched::Ignored`] rather than as
//! errors: noise on the radio link is expected and never needs attention.

use std::sync::Arc;

use sensor_gateway_core::{
    parse_line, DownlinkCommand, DownlinkFrame, FrameError, InboundLine, SensorChannel, SensorId,
    Uplink,
};
use tracing::{debug, warn};

use crate::application::gateway::GatewayContext;
use crate::application::GatewayError;

/// What a single dispatch did.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Diagnostic,
    Ignored(FrameError),
    Provisioned { sensor: SensorId },
    ConfigResent { sensor: SensorId },
    Published { topic: String },
}

pub struct CommandDispatcher {
    ctx: Arc<GatewayContext>,
}

impl CommandDispatcher {
    pub fn new(ctx: Arc<GatewayContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &GatewayContext {
        &self.ctx
    }

    /// Handles one inbound line.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::DuplicateIdentity`] when a generated id is already
    ///   taken; nothing has been sent and the sensor is expected to retry.
    /// - [`GatewayError::StoreUnavailable`] when the store cannot be read or
    ///   written.
    /// - [`GatewayError::Transport`] when a reply could not be written.
    pub async fn dispatch(&self, line: &str) -> Result<Dispatched, GatewayError> {
        let uplink = match parse_line(line) {
            Ok(InboundLine::Diagnostic) => return Ok(Dispatched::Diagnostic),
            Ok(InboundLine::Command(uplink)) => uplink,
            Err(reason) => return Ok(Dispatched::Ignored(reason)),
        };

        match uplink {
            Uplink::Identify { placeholder } => self.provision(placeholder).await,
            Uplink::ResendConfig { sensor } => self.resend_config(sensor).await,
            Uplink::Temperature { sensor, reading } => {
                self.forward(&sensor, SensorChannel::Temperature, &reading).await
            }
            Uplink::Relay { sensor, state } => {
                self.forward(&sensor, SensorChannel::Relay, &state).await
            }
        }
    }

    async fn provision(&self, placeholder: Option<SensorId>) -> Result<Dispatched, GatewayError> {
        let sensor = (self.ctx.id_source)();
        let config = self.ctx.store.register_sensor(&sensor)?;

        let target = placeholder.unwrap_or_else(SensorId::unassigned);
        let reply = DownlinkFrame::new(target, DownlinkCommand::AssignIdentity(sensor.clone()));
        self.ctx.transport.write_frame(&reply.to_string())?;

        let topic = self.ctx.topics.sensor_topic(&sensor, SensorChannel::Id);
        self.publish(&topic, &config.announcement()).await;

        Ok(Dispatched::Provisioned { sensor })
    }

    async fn resend_config(&self, sensor: SensorId) -> Result<Dispatched, GatewayError> {
        let config = self.ctx.store.get_or_create(&sensor)?;

        if !self.ctx.resync_delay.is_zero() {
            tokio::time::sleep(self.ctx.resync_delay).await;
        }

        let frame = DownlinkFrame::new(sensor.clone(), config.sync_command());
        debug!(%frame, "resending configuration");
        self.ctx.transport.write_frame(&frame.to_string())?;

        Ok(Dispatched::ConfigResent { sensor })
    }

    async fn forward(
        &self,
        sensor: &SensorId,
        channel: SensorChannel,
        value: &str,
    ) -> Result<Dispatched, GatewayError> {
        let topic = self.ctx.topics.sensor_topic(sensor, channel);
        self.publish(&topic, value).await;
        Ok(Dispatched::Published { topic })
    }

    /// Publish failures are dropped: telemetry is periodic and the
    /// announcement is informational.
    async fn publish(&self, topic: &str, payload: &str) {
        if let Err(e) = self.ctx.broker.publish(topic, payload).await {
            warn!(topic, "dropping publication: {e}");
        }
    }
}
