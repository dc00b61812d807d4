//! MQTT adapter built on `rumqttc`.
//!
//! [`MqttBroker`] is the outbound side (the [`Broker`] port).  The inbound
//! side is [`run_broker_loop`], which drives the `rumqttc` event loop, hands
//! every received publish to the [`DownlinkTranslator`], and re-subscribes to
//! the command filter on every (re)connect: the broker may drop our session.
//!
//! Requests to the event loop go through a bounded channel that only drains
//! while the loop is connected.  Publishing and subscribing therefore use the
//! non-waiting `try_*` calls: a full channel means the broker is unreachable,
//! and the request is dropped.
//!
//! `EventLoop::poll` must not be cancelled mid-connect, so the loop only ever
//! drops an in-flight poll on shutdown.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::application::downlink::DownlinkTranslator;
use crate::application::ports::{Broker, BrokerError};
use crate::infrastructure::storage::settings::BrokerSettings;

/// Capacity of the request channel between the client and the event loop.
const REQUEST_CHANNEL_CAPACITY: usize = 20;

/// Pause after a connection error before `poll` reconnects.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Maps the numeric level from the settings file.
pub fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Builds the client and its (not yet polled) event loop.
pub fn connect(settings: &BrokerSettings) -> (MqttBroker, EventLoop) {
    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
    let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
    info!(
        "MQTT client {} configured for {}:{}",
        settings.client_id, settings.host, settings.port
    );
    (
        MqttBroker {
            client,
            qos: qos_from_level(settings.qos),
        },
        eventloop,
    )
}

/// Outbound MQTT publisher.
#[derive(Clone)]
pub struct MqttBroker {
    client: AsyncClient,
    qos: QoS,
}

impl MqttBroker {
    pub fn qos(&self) -> QoS {
        self.qos
    }
}

#[async_trait]
impl Broker for MqttBroker {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BrokerError> {
        self.client
            .try_publish(topic, self.qos, false, payload.as_bytes().to_vec())
            .map_err(|e| BrokerError::Unavailable(e.to_string()))
    }
}

/// Resolves once `shutdown` turns `true` or its sender is dropped.
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Drives the MQTT connection until `shutdown` turns `true`.
///
/// Connection errors are logged and retried after a short pause; they never
/// end the loop.
pub async fn run_broker_loop(
    mut eventloop: EventLoop,
    broker: MqttBroker,
    command_filter: String,
    translator: DownlinkTranslator,
    shutdown: watch::Receiver<bool>,
) {
    info!("broker loop started");
    let stopped = shutdown_requested(shutdown);
    tokio::pin!(stopped);

    loop {
        let event = tokio::select! {
            _ = &mut stopped => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("connected to broker, subscribing to {command_filter}");
                if let Err(e) = broker.client.try_subscribe(command_filter.as_str(), broker.qos) {
                    error!("subscribe to {command_filter} failed: {e}");
                }
            }
            Ok(Event::Incoming(Packet::Publish(p))) => {
                debug!(topic = %p.topic, "broker message received");
                translator.handle_message(&p.topic, &p.payload);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => warn!("broker closed the connection"),
            Ok(_) => {}
            Err(e) => {
                warn!("broker connection error: {e}; retrying in {RECONNECT_DELAY:?}");
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        }
    }

    info!("broker loop stopped");
}
