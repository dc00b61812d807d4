//! End-to-end scenarios for the gateway use cases.
//!
//! The dispatcher and the downlink translator share one context built from
//! the in-memory store, the mock transport, and the recording broker, exactly
//! as `main` wires the real adapters.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sensor_gateway::application::dispatcher::{CommandDispatcher, Dispatched};
use sensor_gateway::application::downlink::{DownlinkTranslator, Translated};
use sensor_gateway::application::gateway::{run_transport_loop, GatewayContext};
use sensor_gateway::application::ports::ConfigStore;
use sensor_gateway::application::GatewayError;
use sensor_gateway::infrastructure::broker::mock::RecordingBroker;
use sensor_gateway::infrastructure::storage::sensor_store::SensorStore;
use sensor_gateway::infrastructure::transport::mock::MockTransport;
use sensor_gateway_core::{
    decode_downlink, DownlinkCommand, OperatingMode, SensorConfig, SensorId, TopicLayout,
};

const NODE: &str = "181922274938450";

struct Gateway {
    store: Arc<SensorStore>,
    transport: Arc<MockTransport>,
    broker: Arc<RecordingBroker>,
    dispatcher: CommandDispatcher,
    translator: DownlinkTranslator,
}

fn sid(s: &str) -> SensorId {
    SensorId::parse(s).expect("valid id")
}

fn gateway_with_ids(ids: Vec<&'static str>) -> Gateway {
    let store = Arc::new(SensorStore::in_memory());
    let transport = Arc::new(MockTransport::new());
    let broker = Arc::new(RecordingBroker::new());
    let next = AtomicUsize::new(0);
    let ctx = Arc::new(
        GatewayContext::new(
            store.clone(),
            transport.clone(),
            broker.clone(),
            TopicLayout::new("viper", sid(NODE)),
        )
        .with_resync_delay(Duration::ZERO)
        .with_id_source(Arc::new(move || {
            sid(ids[next.fetch_add(1, Ordering::SeqCst) % ids.len()])
        })),
    );
    Gateway {
        store,
        transport,
        broker,
        dispatcher: CommandDispatcher::new(Arc::clone(&ctx)),
        translator: DownlinkTranslator::new(ctx),
    }
}

fn gateway() -> Gateway {
    gateway_with_ids(vec!["C654321"])
}

fn mode_topic(sensor: &str) -> String {
    format!("viper/node/{NODE}/set/{sensor}/mode")
}

#[tokio::test]
async fn test_new_sensor_is_provisioned_end_to_end() {
    // Arrange
    let gw = gateway();

    // Act
    let outcome = gw.dispatcher.dispatch("0000000:I\n").await.unwrap();

    // Assert
    assert_eq!(outcome, Dispatched::Provisioned { sensor: sid("C654321") });
    assert_eq!(gw.transport.written(), vec!["0000000:SIC654321".to_string()]);
    assert_eq!(
        gw.broker.published(),
        vec![(
            format!("viper/node/{NODE}/sensor/C654321/id"),
            "id:C654321;op_mode:A;lower:26.0;upper:32.0;status:0".to_string()
        )]
    );
    assert_eq!(gw.store.sensors().unwrap(), vec![sid("C654321")]);
    assert_eq!(
        gw.store.get_or_create(&sid("C654321")).unwrap(),
        SensorConfig::new_default(sid("C654321"))
    );
}

#[tokio::test]
async fn test_operator_automatic_command_reaches_sensor_and_store() {
    let gw = gateway();

    let outcome = gw
        .translator
        .translate(&mode_topic("C123456"), b"automatic 30.0 25.0")
        .unwrap();

    assert!(matches!(outcome, Translated::Applied(_)));
    assert_eq!(gw.transport.written(), vec!["C123456:SMA:30.00:25.00".to_string()]);
    let cfg = gw.store.get_or_create(&sid("C123456")).unwrap();
    assert_eq!(cfg.mode, OperatingMode::Automatic);
    assert_eq!(cfg.lower_bound, 25.0);
    assert_eq!(cfg.upper_bound, 30.0);
}

#[tokio::test]
async fn test_sensor_reboot_recovers_operator_settings() {
    // Arrange: the operator changed the sensor while it was running
    let gw = gateway();
    gw.translator
        .translate(&mode_topic("C123456"), b"automatic 32.5 28.0")
        .unwrap();
    gw.transport.clear_written();

    // Act: the sensor reboots and asks for its configuration
    gw.dispatcher.dispatch("C123456:G").await.unwrap();

    // Assert: it gets exactly the stored bounds back
    let written = gw.transport.written();
    assert_eq!(written.len(), 1);
    let frame = decode_downlink(&written[0]).unwrap();
    assert_eq!(frame.target, sid("C123456"));
    assert_eq!(
        frame.command,
        DownlinkCommand::Automatic {
            upper: 32.5,
            lower: 28.0
        }
    );
}

#[tokio::test]
async fn test_override_then_resync_sends_override() {
    let gw = gateway();
    gw.translator
        .translate(&mode_topic("C123456"), b"override relay on")
        .unwrap();
    gw.dispatcher.dispatch("C123456:G").await.unwrap();

    assert_eq!(
        gw.transport.written(),
        vec!["C123456:SMO1".to_string(), "C123456:SMO1".to_string()]
    );
    assert!(gw.store.get_or_create(&sid("C123456")).unwrap().relay_on);
}

#[tokio::test]
async fn test_telemetry_does_not_touch_store() {
    let gw = gateway();

    gw.dispatcher.dispatch("C123456:t:29.3").await.unwrap();
    gw.dispatcher.dispatch("C123456:r:1").await.unwrap();

    assert_eq!(
        gw.broker.published(),
        vec![
            (
                format!("viper/node/{NODE}/sensor/C123456/temperature"),
                "29.3".to_string()
            ),
            (format!("viper/node/{NODE}/sensor/C123456/relay"), "1".to_string()),
        ]
    );
    assert!(gw.store.sensors().unwrap().is_empty());
}

#[tokio::test]
async fn test_diagnostics_have_no_effect() {
    let gw = gateway();

    let outcome = gw.dispatcher.dispatch("DEBUG: anything").await.unwrap();

    assert_eq!(outcome, Dispatched::Diagnostic);
    assert!(gw.broker.published().is_empty());
    assert!(gw.transport.written().is_empty());
    assert!(gw.store.sensors().unwrap().is_empty());
}

#[tokio::test]
async fn test_reprovisioning_never_resets_existing_config() {
    // Arrange: C654321 exists and has custom settings
    let gw = gateway_with_ids(vec!["C654321", "C111111"]);
    gw.dispatcher.dispatch("I").await.unwrap();
    gw.translator
        .translate(&mode_topic("C654321"), b"report")
        .unwrap();

    // Act: the id source repeats C654321 on the third call
    gw.dispatcher.dispatch("I").await.unwrap();
    let third = gw.dispatcher.dispatch("I").await;

    // Assert
    assert!(matches!(third, Err(GatewayError::DuplicateIdentity(_))));
    assert_eq!(
        gw.store.get_or_create(&sid("C654321")).unwrap().mode,
        OperatingMode::ReportOnly
    );
    assert_eq!(gw.store.sensors().unwrap(), vec![sid("C111111"), sid("C654321")]);
}

#[tokio::test]
async fn test_poll_loop_processes_mixed_traffic() {
    // Arrange
    let gw = gateway();
    for line in [
        "DEBUG: boot",
        "0000000:I",
        "C654321:t:24.1",
        "garbage line",
        "C654321:G",
    ] {
        gw.transport.inject_line(line);
    }
    gw.transport.close();

    // Act
    run_transport_loop(
        gw.dispatcher,
        Duration::from_millis(1),
        Arc::new(AtomicBool::new(true)),
    )
    .await;

    // Assert
    assert_eq!(
        gw.transport.written(),
        vec![
            "0000000:SIC654321".to_string(),
            "C654321:SMA:32.00:26.00".to_string()
        ]
    );
    assert_eq!(gw.broker.published().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_feeds_never_lose_an_operator_update() {
    // Arrange: a file-backed store shared by both feeds
    let path = std::env::temp_dir()
        .join(format!("gw-concurrent-{}", uuid::Uuid::new_v4()))
        .join("sensors.toml");
    let store = Arc::new(SensorStore::open(&path).unwrap());
    let transport = Arc::new(MockTransport::new());
    let ctx = Arc::new(
        GatewayContext::new(
            store.clone(),
            transport.clone(),
            Arc::new(RecordingBroker::new()),
            TopicLayout::new("viper", sid(NODE)),
        )
        .with_resync_delay(Duration::ZERO),
    );
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&ctx)));
    let translator = Arc::new(DownlinkTranslator::new(ctx));
    let sensors: Vec<String> = (0..8).map(|i| format!("C1000{i:02}")).collect();

    // Act: per sensor, the operator walks through several modes while the
    // sensor keeps asking for its configuration
    let mut tasks = Vec::new();
    for (i, sensor) in sensors.iter().enumerate() {
        let translator = Arc::clone(&translator);
        let topic = mode_topic(sensor);
        let upper = 30 + i;
        tasks.push(tokio::spawn(async move {
            let payloads = [
                "report".to_string(),
                "override relay on".to_string(),
                format!("automatic {upper} 20"),
            ];
            for payload in payloads {
                translator.translate(&topic, payload.as_bytes()).unwrap();
                tokio::task::yield_now().await;
            }
        }));

        let dispatcher = Arc::clone(&dispatcher);
        let line = format!("{sensor}:G");
        tasks.push(tokio::spawn(async move {
            for _ in 0..10 {
                dispatcher.dispatch(&line).await.unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Assert: the last operator command wins, in memory and on disk
    let reopened = SensorStore::open(&path).unwrap();
    for (i, sensor) in sensors.iter().enumerate() {
        for s in [&*store, &reopened] {
            let cfg = s.get_or_create(&sid(sensor)).unwrap();
            assert_eq!(cfg.mode, OperatingMode::Automatic, "sensor {sensor}");
            assert_eq!(cfg.upper_bound, (30 + i) as f64, "sensor {sensor}");
            assert_eq!(cfg.lower_bound, 20.0, "sensor {sensor}");
        }
    }
    assert_eq!(transport.written().len(), 8 * 3 + 8 * 10);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
