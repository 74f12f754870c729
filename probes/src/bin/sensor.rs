use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use farm_probes::sample::SampleArgs;
use farm_simulator::config::{init_tracing, BrokerArgs};
use farm_simulator::mqtt::{self, Transport};
use farm_simulator::telemetry::data_topic;
use tracing::info;

/// Publishes a single sensor payload and exits.
#[derive(Debug, Parser)]
#[command(name = "sensor")]
struct SensorArgs {
    #[command(flatten)]
    broker: BrokerArgs,

    #[command(flatten)]
    sample: SampleArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = SensorArgs::parse();

    init_tracing();

    let connection = mqtt::connect(&args.broker.settings("sensor"))
        .await
        .context("sensor failed to connect to MQTT broker")?;
    info!(
        "Connected to MQTT broker at {}:{}",
        args.broker.host, args.broker.port
    );

    let topic = data_topic(&args.sample.device_id);
    let payload = serde_json::to_string(&args.sample.payload(Utc::now()))?;

    connection
        .publish(&topic, payload.clone().into_bytes())
        .await
        .with_context(|| format!("failed to send message to topic {}", topic))?;
    info!("Sent `{}` to topic `{}`", payload, topic);

    connection.close().await?;
    Ok(())
}
