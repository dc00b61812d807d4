//! Gateway context and the transport poll loop.
//!
//! [`GatewayContext`] bundles everything the two use cases share: the store,
//! the transport, the broker, and the topic layout.  It is built once at
//! startup and handed to the [`CommandDispatcher`] and the
//! [`DownlinkTranslator`](crate::application::downlink::DownlinkTranslator)
//! behind an `Arc`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use sensor_gateway_core::{SensorId, TopicLayout};
use tracing::{debug, error, info, warn};

use crate::application::dispatcher::{CommandDispatcher, Dispatched};
use crate::application::ports::{Broker, ConfigStore, Transport, TransportError};
use crate::application::GatewayError;

/// Default pause before answering a resend request.  The sensor needs this
/// long to switch its radio from transmit to receive.
pub const DEFAULT_RESYNC_DELAY: Duration = Duration::from_millis(100);

/// Default sleep between transport polls when no line is waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Produces candidate ids for newly provisioned sensors.
pub type IdSource = Arc<dyn Fn() -> SensorId + Send + Sync>;

/// Shared collaborators of the dispatcher and the downlink translator.
pub struct GatewayContext {
    pub store: Arc<dyn ConfigStore>,
    pub transport: Arc<dyn Transport>,
    pub broker: Arc<dyn Broker>,
    pub topics: TopicLayout,
    pub resync_delay: Duration,
    pub id_source: IdSource,
}

impl GatewayContext {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        transport: Arc<dyn Transport>,
        broker: Arc<dyn Broker>,
        topics: TopicLayout,
    ) -> Self {
        Self {
            store,
            transport,
            broker,
            topics,
            resync_delay: DEFAULT_RESYNC_DELAY,
            id_source: Arc::new(|| SensorId::generate(&mut rand::thread_rng())),
        }
    }

    pub fn with_resync_delay(mut self, delay: Duration) -> Self {
        self.resync_delay = delay;
        self
    }

    /// Replaces the random id generator, e.g. with a fixed sequence in tests.
    pub fn with_id_source(mut self, source: IdSource) -> Self {
        self.id_source = source;
        self
    }
}

/// Polls the transport and dispatches every line until `running` is cleared
/// or the transport closes.
///
/// No dispatch error ends the loop.  Each is logged at a level matching its
/// severity and the next line is read.
pub async fn run_transport_loop(
    dispatcher: CommandDispatcher,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
) {
    let transport = Arc::clone(&dispatcher.context().transport);
    info!("transport loop started");

    while running.load(Ordering::Relaxed) {
        match transport.try_read_frame() {
            Ok(Some(line)) => log_outcome(&line, dispatcher.dispatch(&line).await),
            Ok(None) => tokio::time::sleep(poll_interval).await,
            Err(TransportError::Closed) => {
                error!("transport closed; stopping transport loop");
                break;
            }
            Err(e) => {
                warn!("transport read failed: {e}");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }

    info!("transport loop stopped");
}

fn log_outcome(line: &str, outcome: Result<Dispatched, GatewayError>) {
    match outcome {
        Ok(Dispatched::Diagnostic) => debug!(line, "diagnostic line discarded"),
        Ok(Dispatched::Ignored(reason)) => debug!(line, "ignored frame: {reason}"),
        Ok(Dispatched::Provisioned { sensor }) => info!(%sensor, "provisioned new sensor"),
        Ok(Dispatched::ConfigResent { sensor }) => debug!(%sensor, "configuration resent"),
        Ok(Dispatched::Published { topic }) => debug!(topic, "telemetry forwarded"),
        Err(e @ GatewayError::StoreUnavailable(_)) => error!(line, "{e}"),
        Err(e) => warn!(line, "{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockConfigStore, StoreError};
    use crate::infrastructure::broker::mock::RecordingBroker;
    use crate::infrastructure::storage::sensor_store::SensorStore;
    use crate::infrastructure::transport::mock::MockTransport;

    fn context(transport: Arc<MockTransport>, broker: Arc<RecordingBroker>) -> GatewayContext {
        GatewayContext::new(
            Arc::new(SensorStore::in_memory()),
            transport,
            broker,
            TopicLayout::new("viper", SensorId::parse("42").unwrap()),
        )
        .with_resync_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_loop_drains_queued_lines_then_stops_on_close() {
        // Arrange
        let transport = Arc::new(MockTransport::new());
        transport.inject_line("C123456:t:29.3");
        transport.inject_line("C123456:r:1");
        transport.close();
        let broker = Arc::new(RecordingBroker::new());
        let dispatcher = CommandDispatcher::new(Arc::new(context(
            Arc::clone(&transport),
            Arc::clone(&broker),
        )));

        // Act
        run_transport_loop(dispatcher, Duration::from_millis(1), Arc::new(AtomicBool::new(true)))
            .await;

        // Assert
        let published = broker.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].1, "29.3");
        assert_eq!(published[1].1, "1");
    }

    #[tokio::test]
    async fn test_loop_exits_when_running_flag_is_cleared() {
        let transport = Arc::new(MockTransport::new());
        let broker = Arc::new(RecordingBroker::new());
        let dispatcher = CommandDispatcher::new(Arc::new(context(transport, broker)));
        let running = Arc::new(AtomicBool::new(true));

        let handle = tokio::spawn(run_transport_loop(
            dispatcher,
            Duration::from_millis(1),
            Arc::clone(&running),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;
        running.store(false, Ordering::Relaxed);

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "loop must observe the cleared flag");
    }

    #[tokio::test]
    async fn test_loop_survives_malformed_lines() {
        let transport = Arc::new(MockTransport::new());
        transport.inject_line("garbage");
        transport.inject_line("C123456:t:");
        transport.inject_line("C123456:t:21.5");
        transport.close();
        let broker = Arc::new(RecordingBroker::new());
        let dispatcher = CommandDispatcher::new(Arc::new(context(
            Arc::clone(&transport),
            Arc::clone(&broker),
        )));

        run_transport_loop(dispatcher, Duration::from_millis(1), Arc::new(AtomicBool::new(true)))
            .await;

        assert_eq!(broker.published().len(), 1);
    }

    #[tokio::test]
    async fn test_loop_continues_after_store_failure() {
        // Arrange
        let mut store = MockConfigStore::new();
        store
            .expect_get_or_create()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("disk full".to_string())));
        let transport = Arc::new(MockTransport::new());
        transport.inject_line("C123456:G");
        transport.inject_line("C123456:t:21.5");
        transport.close();
        let broker = Arc::new(RecordingBroker::new());
        let ctx = GatewayContext::new(
            Arc::new(store),
            transport.clone(),
            broker.clone(),
            TopicLayout::new("viper", SensorId::parse("42").unwrap()),
        )
        .with_resync_delay(Duration::ZERO);

        // Act
        run_transport_loop(
            CommandDispatcher::new(Arc::new(ctx)),
            Duration::from_millis(1),
            Arc::new(AtomicBool::new(true)),
        )
        .await;

        // Assert
        assert!(transport.written().is_empty(), "no config frame without a config");
        assert_eq!(broker.published().len(), 1);
        assert_eq!(broker.published()[0].1, "21.5");
    }
}
