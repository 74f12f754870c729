use crate::device::{Device, SensorKind};
use crate::metrics::IRRIGATION_EVENTS_TOTAL;
use crate::telemetry::{Measurement, PayloadProfile, Reading};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::{debug, info, warn};

pub const HUMIDITY_MIN: f64 = 30.0;
pub const HUMIDITY_MAX: f64 = 95.0;
pub const SOIL_MOISTURE_MIN: f64 = 20.0;
pub const SOIL_MOISTURE_MAX: f64 = 70.0;
pub const PH_MIN: f64 = 5.5;
pub const PH_MAX: f64 = 7.5;
pub const LIGHT_MIN: f64 = 0.0;

const TEMPERATURE_AMPLITUDE: f64 = 5.0;
const PEAK_DAYLIGHT_LUX: f64 = 50_000.0;
const IRRIGATION_PROBABILITY: f64 = 0.02;
const HEAT_WAVE_BOOST: f64 = 10.0;
const DROUGHT_EXTRA_DRAIN: f64 = 0.5;

/// Field condition preset applied for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    #[default]
    Normal,
    /// Base temperature raised by 10 °C.
    HeatWave,
    /// Soil dries an extra 0.5 % per reading.
    Drought,
}

/// Running values shared by every device of the same kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub base_temperature: f64,
    pub base_humidity: f64,
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub ph_level: f64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            base_temperature: 28.0,
            base_humidity: 65.0,
            soil_moisture: 50.0,
            light_intensity: 10_000.0,
            ph_level: 6.5,
        }
    }
}

pub struct Generator<R = StdRng> {
    state: SimulationState,
    profile: PayloadProfile,
    scenario: Scenario,
    rng: R,
}

impl Generator<StdRng> {
    pub fn new(profile: PayloadProfile, scenario: Scenario) -> Self {
        Self::with_rng(profile, scenario, StdRng::from_entropy())
    }
}

impl<R: Rng> Generator<R> {
    pub fn with_rng(profile: PayloadProfile, scenario: Scenario, rng: R) -> Self {
        let mut state = SimulationState::default();
        if scenario == Scenario::HeatWave {
            state.base_temperature += HEAT_WAVE_BOOST;
        }

        Self {
            state,
            profile,
            scenario,
            rng,
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn profile(&self) -> &PayloadProfile {
        &self.profile
    }

    /// Produces one reading per simulatable device, in roster order.
    pub fn tick(
        &mut self,
        devices: &[Device],
        hour: f64,
        timestamp: DateTime<Utc>,
    ) -> Vec<Reading> {
        devices
            .iter()
            .filter_map(|device| self.reading_for(device, hour, timestamp))
            .collect()
    }

    pub fn reading_for(
        &mut self,
        device: &Device,
        hour: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<Reading> {
        let measurement = match device.kind {
            SensorKind::Dht22 => self.climate(hour),
            SensorKind::SoilMoisture => {
                self.step_soil();
                Measurement::SoilMoisture {
                    soil_moisture: round2(self.state.soil_moisture),
                }
            }
            SensorKind::Light => self.light(hour),
            SensorKind::Ph => self.ph(),
            SensorKind::Unknown => {
                warn!("Skipping device {}: unsupported sensor type", device.id);
                return None;
            }
        };

        Some(Reading {
            farm_id: self.profile.farm_id,
            device_id: device.id.clone(),
            sensor_type: device.kind,
            measurement,
            timestamp,
        })
    }

    fn climate(&mut self, hour: f64) -> Measurement {
        let variation = TEMPERATURE_AMPLITUDE * day_phase(hour);
        let temperature = self.state.base_temperature + variation + self.rng.gen_range(-1.0..=1.0);

        // humidity runs opposite to the temperature swing
        let humidity = (self.state.base_humidity - variation * 2.0 + self.rng.gen_range(-3.0..=3.0))
            .clamp(HUMIDITY_MIN, HUMIDITY_MAX);

        Measurement::Climate {
            temperature: round2(temperature),
            humidity: round2(humidity),
        }
    }

    /// Advances soil moisture by one reading. Returns true if irrigation fired.
    pub(crate) fn step_soil(&mut self) -> bool {
        let irrigated = self.rng.gen_bool(IRRIGATION_PROBABILITY);

        if irrigated {
            self.state.soil_moisture += self.rng.gen_range(15.0..=25.0);
        } else {
            self.state.soil_moisture -= self.rng.gen_range(0.05..=0.15);
            if self.scenario == Scenario::Drought {
                self.state.soil_moisture -= DROUGHT_EXTRA_DRAIN;
            }
        }

        self.state.soil_moisture = self
            .state
            .soil_moisture
            .clamp(SOIL_MOISTURE_MIN, SOIL_MOISTURE_MAX);

        if irrigated {
            IRRIGATION_EVENTS_TOTAL.inc();
            info!(
                "Irrigation event, soil moisture now {:.1}%",
                self.state.soil_moisture
            );
        }

        irrigated
    }

    fn light(&mut self, hour: f64) -> Measurement {
        let lux = if (6.0..=18.0).contains(&hour) {
            PEAK_DAYLIGHT_LUX * day_phase(hour) + self.rng.gen_range(-2000.0..=2000.0)
        } else {
            self.rng.gen_range(0.0..=100.0)
        };
        self.state.light_intensity = lux.max(LIGHT_MIN);

        Measurement::Light {
            light_intensity: round2(self.state.light_intensity),
        }
    }

    fn ph(&mut self) -> Measurement {
        self.state.ph_level =
            (self.state.ph_level + self.rng.gen_range(-0.02..=0.02)).clamp(PH_MIN, PH_MAX);
        debug!("pH drifted to {:.3}", self.state.ph_level);

        Measurement::ph(round2(self.state.ph_level), self.profile.ph_field)
    }
}

/// `sin` over the day, zero at 06:00 and 18:00, peaking at noon.
fn day_phase(hour: f64) -> f64 {
    ((hour - 6.0) * PI / 12.0).sin()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::default_roster;
    use crate::telemetry::PhField;

    fn seeded(scenario: Scenario, seed: u64) -> Generator<StdRng> {
        Generator::with_rng(
            PayloadProfile::default(),
            scenario,
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_values_stay_in_range() {
        let mut sim = seeded(Scenario::Normal, 7);
        let roster = default_roster();
        let now = Utc::now();

        for step in 0..5_000 {
            let hour = (step as f64 * 0.37) % 24.0;
            for reading in sim.tick(&roster, hour, now) {
                match reading.measurement {
                    Measurement::Climate { humidity, .. } => {
                        assert!((HUMIDITY_MIN..=HUMIDITY_MAX).contains(&humidity))
                    }
                    Measurement::SoilMoisture { soil_moisture } => {
                        assert!((SOIL_MOISTURE_MIN..=SOIL_MOISTURE_MAX).contains(&soil_moisture))
                    }
                    Measurement::Light { light_intensity } => assert!(light_intensity >= LIGHT_MIN),
                    Measurement::SoilPh { soil_ph } => assert!((PH_MIN..=PH_MAX).contains(&soil_ph)),
                    Measurement::Ph { .. } => panic!("default profile uses soilPH"),
                }
            }
        }
    }

    #[test]
    fn test_soil_decays_unless_irrigated() {
        for scenario in [Scenario::Normal, Scenario::Drought] {
            let mut sim = seeded(scenario, 42);
            let mut irrigations = 0;

            for _ in 0..5_000 {
                let before = sim.state().soil_moisture;
                let irrigated = sim.step_soil();
                let after = sim.state().soil_moisture;

                if irrigated {
                    irrigations += 1;
                    let expected_max = (before + 25.0).min(SOIL_MOISTURE_MAX);
                    assert!(after <= expected_max + 1e-9);
                    if before + 15.0 <= SOIL_MOISTURE_MAX {
                        assert!(after >= before + 15.0 - 1e-9);
                    }
                } else {
                    assert!(after <= before);
                }
            }

            assert!(irrigations > 0, "no irrigation in 5000 readings");
        }
    }

    #[test]
    fn test_noon_brighter_than_midnight() {
        let mut sim = seeded(Scenario::Normal, 3);
        let light = [Device::new("LIGHT-1", SensorKind::Light, "Zone A")];
        let now = Utc::now();

        let mean = |sim: &mut Generator<StdRng>, hour: f64| {
            let total: f64 = (0..200)
                .map(|_| match sim.tick(&light, hour, now)[0].measurement {
                    Measurement::Light { light_intensity } => light_intensity,
                    _ => unreachable!(),
                })
                .sum();
            total / 200.0
        };

        let noon = mean(&mut sim, 12.0);
        let midnight = mean(&mut sim, 0.0);
        assert!(noon > 40_000.0);
        assert!(midnight <= 100.0);
    }

    #[test]
    fn test_three_dht22_ticks() {
        let mut sim = seeded(Scenario::Normal, 11);
        let roster = [Device::new("DHT22-0001", SensorKind::Dht22, "Zone A")];

        let readings: Vec<Reading> = (0..3)
            .flat_map(|i| sim.tick(&roster, i as f64 * 10.0 % 24.0, Utc::now()))
            .collect();

        assert_eq!(readings.len(), 3);
        for reading in readings {
            assert_eq!(reading.sensor_type, SensorKind::Dht22);
            let v = serde_json::to_value(&reading).unwrap();
            assert_eq!(v["sensorType"], "DHT22");
            assert!(v["temperature"].is_f64());
            let humidity = v["humidity"].as_f64().unwrap();
            assert!((HUMIDITY_MIN..=HUMIDITY_MAX).contains(&humidity));
        }
    }

    #[test]
    fn test_unknown_kind_skipped() {
        let mut sim = seeded(Scenario::Normal, 5);
        let roster = [
            Device::new("CO2-1", SensorKind::Unknown, "Barn"),
            Device::new("PH-1", SensorKind::Ph, "Barn"),
        ];

        let readings = sim.tick(&roster, 9.0, Utc::now());
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].device_id, "PH-1");
    }

    #[test]
    fn test_profile_applied() {
        let profile = PayloadProfile {
            farm_id: Some(1),
            ph_field: PhField::Ph,
        };
        let mut sim = Generator::with_rng(profile, Scenario::Normal, StdRng::seed_from_u64(1));
        let roster = [Device::new("PH-1", SensorKind::Ph, "Zone A")];

        let reading = sim.tick(&roster, 0.0, Utc::now()).remove(0);
        assert_eq!(reading.farm_id, Some(1));
        assert!(matches!(reading.measurement, Measurement::Ph { .. }));
    }

    #[test]
    fn test_heat_wave_raises_base_temperature() {
        let normal = seeded(Scenario::Normal, 1);
        let hot = seeded(Scenario::HeatWave, 1);
        assert_eq!(
            hot.state().base_temperature - normal.state().base_temperature,
            HEAT_WAVE_BOOST
        );
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(6.4567), 6.46);
        assert_eq!(round2(-0.004), -0.0);
    }
}
