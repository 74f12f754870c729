use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Sensor hardware a simulated device pretends to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    #[serde(rename = "DHT22")]
    Dht22,
    #[serde(rename = "SOIL_MOISTURE")]
    SoilMoisture,
    #[serde(rename = "LIGHT")]
    Light,
    #[serde(rename = "PH")]
    Ph,
    /// Anything a roster file names that we cannot simulate.
    #[serde(rename = "UNKNOWN")]
    #[serde(other)]
    Unknown,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Dht22 => "DHT22",
            SensorKind::SoilMoisture => "SOIL_MOISTURE",
            SensorKind::Light => "LIGHT",
            SensorKind::Ph => "PH",
            SensorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SensorKind,
    #[serde(default)]
    pub location: String,
}

impl Device {
    pub fn new(id: impl Into<String>, kind: SensorKind, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            location: location.into(),
        }
    }
}

/// Devices registered for farm 1 in the dashboard.
pub fn default_roster() -> Vec<Device> {
    vec![
        Device::new("DHT22-0001", SensorKind::Dht22, "Zone A"),
        Device::new("DHT22-0002", SensorKind::Dht22, "Zone B"),
        Device::new("SOIL-0001", SensorKind::SoilMoisture, "Zone A"),
        Device::new("SOIL-0002", SensorKind::SoilMoisture, "Zone B"),
        Device::new("LIGHT-0001", SensorKind::Light, "Zone A"),
        Device::new("PH-0001", SensorKind::Ph, "Zone A"),
    ]
}

/// Loads a JSON array of devices, e.g.
/// `[{"id": "SOIL-0003", "type": "SOIL_MOISTURE", "location": "Zone C"}]`.
pub fn load_roster(path: &Path) -> Result<Vec<Device>> {
    let raw = std::fs::read_to_string(path)?;
    parse_roster(&raw)
}

pub fn parse_roster(raw: &str) -> Result<Vec<Device>> {
    let devices: Vec<Device> = serde_json::from_str(raw)?;

    if devices.is_empty() {
        return Err(Error::Config("device roster is empty".to_string()));
    }

    if let Some(pos) = devices.iter().position(|d| d.id.trim().is_empty()) {
        return Err(Error::Config(format!(
            "device at index {} has an empty id",
            pos
        )));
    }

    Ok(devices)
}
