use anyhow::Context;
use clap::Parser;
use farm_simulator::clock::SimClock;
use farm_simulator::config::{init_tracing, SimulatorArgs};
use farm_simulator::generator::Generator;
use farm_simulator::{metrics, mqtt, runner};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = SimulatorArgs::parse();

    init_tracing();

    let devices = args.roster().context("failed to load device roster")?;

    info!("Starting Smart Farm IoT Simulator");
    info!(
        "Broker: {}:{}, Interval: {}s, Devices: {}",
        args.broker.host,
        args.broker.port,
        args.interval,
        devices.len()
    );

    metrics::init_metrics().context("failed to register metrics")?;
    if let Some(addr) = args.metrics_addr.clone() {
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(&addr).await {
                error!("Metrics endpoint failed: {}", e);
            }
        });
    }

    let connection = match mqtt::connect(&args.broker.settings("farm-sim")).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to MQTT broker: {}. Exiting", e);
            std::process::exit(1);
        }
    };

    let mut generator = Generator::new(args.profile(), args.scenario);
    let mut clock = SimClock::start();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    runner::run_forever(
        &connection,
        &mut generator,
        &devices,
        args.interval(),
        &mut clock,
        shutdown,
    )
    .await;

    connection.close().await?;
    info!("Simulator stopped gracefully");
    Ok(())
}
