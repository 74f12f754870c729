use crate::device::SensorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub fn data_topic(device_id: &str) -> String {
    format!("sensor/{}/data", device_id)
}

pub fn status_topic(device_id: &str) -> String {
    format!("device/{}/status", device_id)
}

pub fn control_topic(device_id: &str) -> String {
    format!("device/{}/control", device_id)
}

/// JSON key used for pH readings. Older backends read `ph`, current ones `soilPH`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PhField {
    #[default]
    SoilPh,
    Ph,
}

/// Per-deployment payload shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadProfile {
    pub farm_id: Option<i64>,
    pub ph_field: PhField,
}

/// Measurement fields; flattened into the reading object on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measurement {
    Climate {
        temperature: f64,
        humidity: f64,
    },
    SoilMoisture {
        #[serde(rename = "soilMoisture")]
        soil_moisture: f64,
    },
    Light {
        #[serde(rename = "lightIntensity")]
        light_intensity: f64,
    },
    SoilPh {
        #[serde(rename = "soilPH")]
        soil_ph: f64,
    },
    Ph {
        ph: f64,
    },
}

impl Measurement {
    pub fn ph(value: f64, field: PhField) -> Self {
        match field {
            PhField::SoilPh => Measurement::SoilPh { soil_ph: value },
            PhField::Ph => Measurement::Ph { ph: value },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<i64>,
    pub device_id: String,
    pub sensor_type: SensorKind,
    #[serde(flatten)]
    pub measurement: Measurement,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn topic(&self) -> String {
        data_topic(&self.device_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<i64>,
    pub device_id: String,
    pub status: DeviceStatus,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(
        profile: &PayloadProfile,
        device_id: &str,
        status: DeviceStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            farm_id: profile.farm_id,
            device_id: device_id.to_string(),
            status,
            timestamp,
        }
    }

    pub fn topic(&self) -> String {
        status_topic(&self.device_id)
    }
}
