//! Broker topic layout.
//!
//! ```text
//! <base>/node/<nodeId>/sensor/<sensorId>/id            provisioning announcement
//! <base>/node/<nodeId>/sensor/<sensorId>/temperature   temperature reading
//! <base>/node/<nodeId>/sensor/<sensorId>/relay         relay state
//! <base>/node/<nodeId>/set/<sensorId>/mode             operator commands (subscribed)
//! ```

use crate::domain::sensor::SensorId;

/// Subtopic under `set/<sensorId>/` that carries mode commands.
pub const MODE_SUBTOPIC: &str = "mode";

/// Publication channel of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorChannel {
    Id,
    Temperature,
    Relay,
}

impl SensorChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorChannel::Id => "id",
            SensorChannel::Temperature => "temperature",
            SensorChannel::Relay => "relay",
        }
    }
}

/// A command topic split into its variable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTopic {
    pub sensor: SensorId,
    pub subtopic: String,
}

/// Builds and parses topics for one gateway node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    base: String,
    node_id: SensorId,
}

impl TopicLayout {
    /// A trailing `/` on `base` is ignored.
    pub fn new(base: impl Into<String>, node_id: SensorId) -> Self {
        let base = base.into();
        let base = base.trim_end_matches('/').to_string();
        Self { base, node_id }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn node_id(&self) -> &SensorId {
        &self.node_id
    }

    fn node_prefix(&self) -> String {
        format!("{}/node/{}", self.base, self.node_id)
    }

    pub fn sensor_topic(&self, sensor: &SensorId, channel: SensorChannel) -> String {
        format!("{}/sensor/{}/{}", self.node_prefix(), sensor, channel.as_str())
    }

    /// Wildcard subscription covering every command addressed to this node.
    pub fn command_filter(&self) -> String {
        format!("{}/set/#", self.node_prefix())
    }

    /// Splits an incoming command topic.
    ///
    /// Returns `None` for topics outside this node's `set/` tree, topics
    /// without exactly two segments after `set/`, and invalid sensor ids.
    pub fn parse_command_topic(&self, topic: &str) -> Option<CommandTopic> {
        let prefix = format!("{}/set/", self.node_prefix());
        let rest = topic.strip_prefix(&prefix)?;

        let mut segments = rest.split('/');
        let sensor = segments.next()?;
        let subtopic = segments.next()?;
        if segments.next().is_some() || subtopic.is_empty() {
            return None;
        }

        Some(CommandTopic {
            sensor: SensorId::parse(sensor).ok()?,
            subtopic: subtopic.to_string(),
        })
    }
}
