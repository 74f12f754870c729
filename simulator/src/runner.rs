use crate::clock::SimClock;
use crate::device::Device;
use crate::errors::Result;
use crate::generator::Generator;
use crate::metrics::{
    PUBLISH_FAILURES_TOTAL, READINGS_PUBLISHED_TOTAL, SIMULATED_HOUR, STATUS_EVENTS_TOTAL,
};
use crate::mqtt::Transport;
use crate::telemetry::{DeviceStatus, PayloadProfile, Reading, StatusEvent};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counters for one `run_forever` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub published: u64,
    pub failed: u64,
}

/// Serializes a reading and hands it to the transport. Not retried.
pub async fn publish_reading<T: Transport>(transport: &T, reading: &Reading) -> Result<()> {
    let payload = serde_json::to_vec(reading)?;
    transport.publish(&reading.topic(), payload).await
}

pub async fn publish_status<T: Transport>(transport: &T, event: &StatusEvent) -> Result<()> {
    let payload = serde_json::to_vec(event)?;
    transport.publish(&event.topic(), payload).await
}

/// Announces every device ONLINE, then ticks every `interval` until `shutdown`
/// resolves, then announces every device OFFLINE.
pub async fn run_forever<T, R, F>(
    transport: &T,
    generator: &mut Generator<R>,
    devices: &[Device],
    interval: Duration,
    clock: &mut SimClock,
    shutdown: F,
) -> RunSummary
where
    T: Transport,
    R: Rng,
    F: Future<Output = ()>,
{
    let profile = generator.profile().clone();
    let mut summary = RunSummary::default();

    info!(
        "Starting simulation: {} devices, interval {:?}, scenario {:?}",
        devices.len(),
        interval,
        generator.scenario()
    );

    announce(transport, devices, &profile, DeviceStatus::Online, clock).await;

    tokio::pin!(shutdown);

    loop {
        summary.ticks += 1;
        let hour = clock.hour();
        SIMULATED_HOUR.set(hour);
        info!("Tick {} | simulated {:02}:00", summary.ticks, hour as u32);

        let readings = generator.tick(devices, hour, clock.stamp());
        for reading in &readings {
            match publish_reading(transport, reading).await {
                Ok(()) => {
                    summary.published += 1;
                    READINGS_PUBLISHED_TOTAL.inc();
                    debug!("Published {} data from {}", reading.sensor_type, reading.device_id);
                }
                Err(e) => {
                    summary.failed += 1;
                    PUBLISH_FAILURES_TOTAL.inc();
                    warn!("Failed to publish data for {}: {}", reading.device_id, e);
                }
            }
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal, stopping simulator");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    announce(transport, devices, &profile, DeviceStatus::Offline, clock).await;

    info!(
        "Simulator stopped after {} ticks: {} published, {} failed",
        summary.ticks, summary.published, summary.failed
    );
    summary
}

async fn announce<T: Transport>(
    transport: &T,
    devices: &[Device],
    profile: &PayloadProfile,
    status: DeviceStatus,
    clock: &mut SimClock,
) {
    for device in devices {
        let event = StatusEvent::new(profile, &device.id, status, clock.stamp());
        match publish_status(transport, &event).await {
            Ok(()) => {
                STATUS_EVENTS_TOTAL.inc();
                info!("Published status for {}: {:?}", device.id, status);
            }
            Err(e) => {
                PUBLISH_FAILURES_TOTAL.inc();
                warn!("Failed to publish {:?} status for {}: {}", status, device.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SensorKind;
    use crate::errors::Error;
    use crate::telemetry::Measurement;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl Transport for Recorder {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
            let value = serde_json::from_slice(&payload)?;
            self.sent.lock().unwrap().push((topic.to_string(), value));
            Ok(())
        }
    }

    struct Offline;

    impl Transport for Offline {
        async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<()> {
            Err(Error::NotConnected)
        }
    }

    fn light_reading() -> Reading {
        Reading {
            farm_id: None,
            device_id: "LIGHT-0001".to_string(),
            sensor_type: SensorKind::Light,
            measurement: Measurement::Light {
                light_intensity: 321.5,
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_publish_reading_topic_and_payload() {
        tokio_test::block_on(async {
            let recorder = Recorder::default();
            publish_reading(&recorder, &light_reading()).await.unwrap();

            let sent = recorder.sent.lock().unwrap();
            assert_eq!(sent[0].0, "sensor/LIGHT-0001/data");
            assert_eq!(sent[0].1["lightIntensity"], 321.5);
            assert_eq!(sent[0].1["sensorType"], "LIGHT");
        });
    }

    #[test]
    fn test_publish_failure_is_returned() {
        tokio_test::block_on(async {
            let result = publish_reading(&Offline, &light_reading()).await;
            assert!(matches!(result, Err(Error::NotConnected)));
        });
    }
}
