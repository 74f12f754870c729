//! Smart-farm sensor simulator: synthetic DHT22, soil moisture, light and pH
//! readings published to an MQTT broker on a fixed tick.

pub mod clock;
pub mod config;
pub mod device;
pub mod errors;
pub mod generator;
pub mod metrics;
pub mod mqtt;
pub mod runner;
pub mod telemetry;
