use chrono::{DateTime, Utc};
use clap::Args;
use farm_simulator::device::SensorKind;
use serde::Serialize;

/// Field values for the one-shot payload. The defaults carry an abnormal
/// soil pH so that backend alert rules fire.
#[derive(Debug, Clone, Args)]
pub struct SampleArgs {
    #[arg(long, default_value = "SOIL-001")]
    pub device_id: String,

    #[arg(long, default_value = "SOIL_MOISTURE", value_parser = parse_kind)]
    pub sensor_type: SensorKind,

    #[arg(long, default_value_t = 25.0)]
    pub soil_moisture: f64,

    #[arg(long, default_value_t = 28.5)]
    pub temperature: f64,

    #[arg(long, default_value_t = 67.0)]
    pub humidity: f64,

    #[arg(long, default_value_t = 310.0)]
    pub light_intensity: f64,

    #[arg(long, default_value_t = 5.0)]
    pub soil_ph: f64,

    #[arg(long)]
    pub farm_id: Option<i64>,
}

fn parse_kind(raw: &str) -> Result<SensorKind, String> {
    match serde_json::from_value::<SensorKind>(serde_json::Value::String(raw.to_string())) {
        Ok(SensorKind::Unknown) | Err(_) => Err(format!(
            "unknown sensor type {raw}, expected DHT22, SOIL_MOISTURE, LIGHT or PH"
        )),
        Ok(kind) => Ok(kind),
    }
}

/// Every measurement field at once, regardless of `sensorType`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<i64>,
    pub device_id: String,
    pub sensor_type: SensorKind,
    pub light_intensity: f64,
    pub soil_moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "soilPH")]
    pub soil_ph: f64,
    pub timestamp: DateTime<Utc>,
}

impl SampleArgs {
    pub fn payload(&self, timestamp: DateTime<Utc>) -> SamplePayload {
        SamplePayload {
            farm_id: self.farm_id,
            device_id: self.device_id.clone(),
            sensor_type: self.sensor_type,
            light_intensity: self.light_intensity,
            soil_moisture: self.soil_moisture,
            temperature: self.temperature,
            humidity: self.humidity,
            soil_ph: self.soil_ph,
            timestamp,
        }
    }
}
