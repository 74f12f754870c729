use anyhow::Context;
use clap::Parser;
use farm_probes::control::describe;
use farm_simulator::config::{init_tracing, BrokerArgs};
use farm_simulator::mqtt::{self, LinkState};
use farm_simulator::telemetry::control_topic;
use tracing::{error, info, warn};

/// Listens on a pump's control topic and prints every command it receives.
#[derive(Debug, Parser)]
#[command(name = "pump")]
struct PumpArgs {
    #[command(flatten)]
    broker: BrokerArgs,

    /// Must match the deviceId used by the backend rule
    #[arg(long, env = "PUMP_ID", default_value = "PUMP-001")]
    device_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = PumpArgs::parse();

    init_tracing();

    let (connection, mut inbox) = mqtt::connect_with_inbox(&args.broker.settings("pump"), 64)
        .await
        .context("pump failed to connect to MQTT broker")?;

    let topic = control_topic(&args.device_id);
    connection.subscribe(&topic).await?;
    info!("Pump is listening on topic: {}", topic);

    let mut link = connection.watch_link();

    loop {
        tokio::select! {
            message = inbox.recv() => {
                match message {
                    Some(publish) => info!("\n{}", describe(&publish)),
                    None => {
                        error!("MQTT event loop stopped");
                        break;
                    }
                }
            }
            changed = link.changed() => {
                if changed.is_err() {
                    error!("MQTT event loop stopped");
                    break;
                }
                let state = link.borrow_and_update().clone();
                if state == LinkState::Connected {
                    // clean session drops subscriptions on reconnect
                    if let Err(e) = connection.subscribe(&topic).await {
                        warn!("Failed to resubscribe to {}: {}", topic, e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    connection.close().await?;
    Ok(())
}
