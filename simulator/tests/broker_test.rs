//! Needs a broker on localhost:1883, e.g. `docker run -p 1883:1883 eclipse-mosquitto`.

use farm_simulator::clock::SimClock;
use farm_simulator::device::default_roster;
use farm_simulator::generator::{Generator, Scenario};
use farm_simulator::mqtt::{self, BrokerSettings};
use farm_simulator::runner::run_forever;
use farm_simulator::telemetry::PayloadProfile;
use std::time::Duration;

#[tokio::test]
#[ignore]
async fn test_roster_round_trip_through_broker() {
    let devices = default_roster();

    let (watcher, mut inbox) =
        mqtt::connect_with_inbox(&BrokerSettings::new("farm-sim-watch", "localhost", 1883), 256)
            .await
            .expect("watcher connects");
    watcher.subscribe("sensor/+/data").await.unwrap();
    watcher.subscribe("device/+/status").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let publisher = mqtt::connect(&BrokerSettings::new("farm-sim-test", "localhost", 1883))
        .await
        .expect("publisher connects");
    let mut generator = Generator::new(PayloadProfile::default(), Scenario::Normal);
    let mut clock = SimClock::start();

    let summary = run_forever(
        &publisher,
        &mut generator,
        &devices,
        Duration::from_millis(200),
        &mut clock,
        tokio::time::sleep(Duration::from_secs(1)),
    )
    .await;
    publisher.close().await.unwrap();

    assert_eq!(summary.failed, 0);

    let expected = devices.len() * 2 + summary.published as usize;
    let mut received = 0;
    while received < expected {
        match tokio::time::timeout(Duration::from_secs(5), inbox.recv()).await {
            Ok(Some(publish)) => {
                let v: serde_json::Value = serde_json::from_slice(&publish.payload).unwrap();
                assert!(v["deviceId"].is_string());
                received += 1;
            }
            _ => break,
        }
    }

    assert_eq!(received, expected);
    watcher.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_bad_credentials_refused() {
    // requires a broker configured with allow_anonymous false
    let settings = BrokerSettings::new("farm-sim-test", "localhost", 1883)
        .with_credentials("nobody".to_string(), "wrong".to_string());

    assert!(mqtt::connect(&settings).await.is_err());
}
