use crate::device::{default_roster, load_roster, Device};
use crate::errors::Result;
use crate::generator::Scenario;
use crate::mqtt::BrokerSettings;
use crate::telemetry::{PayloadProfile, PhField};
use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Broker connection flags shared by every binary in the workspace.
#[derive(Debug, Clone, Args)]
pub struct BrokerArgs {
    #[arg(long = "mqtt-host", env = "MQTT_HOST", default_value = "localhost")]
    pub host: String,

    #[arg(long = "mqtt-port", env = "MQTT_PORT", default_value_t = 1883)]
    pub port: u16,

    #[arg(long = "mqtt-user", env = "MQTT_USER")]
    pub username: Option<String>,

    #[arg(long = "mqtt-pass", env = "MQTT_PASS", hide_env_values = true)]
    pub password: Option<String>,
}

impl BrokerArgs {
    pub fn settings(&self, client_prefix: &str) -> BrokerSettings {
        let settings = BrokerSettings::new(client_prefix, &self.host, self.port);
        match &self.username {
            Some(user) => {
                settings.with_credentials(user.clone(), self.password.clone().unwrap_or_default())
            }
            None => settings,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "farm-simulator",
    about = "Publishes synthetic smart-farm sensor readings to an MQTT broker"
)]
pub struct SimulatorArgs {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// Seconds between ticks
    #[arg(
        long,
        env = "SIM_INTERVAL",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// JSON device roster; the built-in six-device farm is used when absent
    #[arg(long = "devices", env = "DEVICES_FILE")]
    pub devices_file: Option<PathBuf>,

    /// Adds `farmId` to every payload
    #[arg(long, env = "FARM_ID")]
    pub farm_id: Option<i64>,

    #[arg(long, env = "PH_FIELD", value_enum, default_value_t = PhField::SoilPh)]
    pub ph_field: PhField,

    #[arg(long, env = "SCENARIO", value_enum, default_value_t = Scenario::Normal)]
    pub scenario: Scenario,

    /// Serve Prometheus metrics on this address, e.g. 0.0.0.0:9100
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_addr: Option<String>,
}

impl SimulatorArgs {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn profile(&self) -> PayloadProfile {
        PayloadProfile {
            farm_id: self.farm_id,
            ph_field: self.ph_field,
        }
    }

    pub fn roster(&self) -> Result<Vec<Device>> {
        match &self.devices_file {
            Some(path) => load_roster(path),
            None => Ok(default_roster()),
        }
    }
}

/// `RUST_LOG`-driven fmt subscriber, `info` when unset.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
