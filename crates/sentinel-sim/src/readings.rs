//! Simulated sensor readings
//!
//! Stand-in for a real anomaly signal: compromised devices draw from wider
//! ranges than active ones. Nothing is trained or evaluated.

use rand::Rng;
use sentinel_core::{Device, DeviceStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Motion,
}

impl SensorKind {
    /// Infer the sensor kind from the device name
    pub fn for_device_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "sensor1" => return Some(SensorKind::Temperature),
            "sensor2" => return Some(SensorKind::Humidity),
            "sensor3" => return Some(SensorKind::Motion),
            _ => {}
        }

        if name.starts_with("temp") || name.starts_with("thermo") {
            Some(SensorKind::Temperature)
        } else if name.starts_with("humid") {
            Some(SensorKind::Humidity)
        } else if name.starts_with("motion") {
            Some(SensorKind::Motion)
        } else {
            None
        }
    }
}

/// Half-open numeric range `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingRange {
    pub min: f64,
    pub max: f64,
}

impl ReadingRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }

    /// `self` covers `other` and extends past it on at least one side
    pub fn strictly_contains(&self, other: &ReadingRange) -> bool {
        self.min <= other.min
            && self.max >= other.max
            && (self.min < other.min || self.max > other.max)
    }
}

const TEMPERATURE_NORMAL: ReadingRange = ReadingRange::new(20.0, 30.0);
const TEMPERATURE_SPIKED: ReadingRange = ReadingRange::new(10.0, 50.0);
const HUMIDITY_NORMAL: ReadingRange = ReadingRange::new(30.0, 70.0);
const HUMIDITY_SPIKED: ReadingRange = ReadingRange::new(10.0, 90.0);
const MOTION_NORMAL_P: f64 = 0.1;
const MOTION_SPIKED_P: f64 = 0.5;

/// Numeric range for a sensor in a given status; `None` for motion sensors
/// and for devices that do not report (isolated, removed)
pub fn reading_range(kind: SensorKind, status: DeviceStatus) -> Option<ReadingRange> {
    match (kind, status) {
        (SensorKind::Temperature, DeviceStatus::Active) => Some(TEMPERATURE_NORMAL),
        (SensorKind::Temperature, DeviceStatus::Compromised) => Some(TEMPERATURE_SPIKED),
        (SensorKind::Humidity, DeviceStatus::Active) => Some(HUMIDITY_NORMAL),
        (SensorKind::Humidity, DeviceStatus::Compromised) => Some(HUMIDITY_SPIKED),
        _ => None,
    }
}

/// Probability that a motion sensor reports movement
pub fn motion_probability(status: DeviceStatus) -> Option<f64> {
    match status {
        DeviceStatus::Active => Some(MOTION_NORMAL_P),
        DeviceStatus::Compromised => Some(MOTION_SPIKED_P),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Numeric(f64),
    Triggered(bool),
}

/// One reading as shown on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedReading {
    pub name: String,
    pub identity_key: String,
    pub status: DeviceStatus,
    pub sensor: Option<SensorKind>,
    pub value: Option<ReadingValue>,
}

pub fn simulate_reading(device: &Device) -> Option<ReadingValue> {
    simulate_reading_with(device, &mut rand::thread_rng())
}

pub fn simulate_reading_with<R: Rng>(device: &Device, rng: &mut R) -> Option<ReadingValue> {
    let kind = SensorKind::for_device_name(&device.name)?;

    if kind == SensorKind::Motion {
        let p = motion_probability(device.status)?;
        return Some(ReadingValue::Triggered(rng.gen_bool(p)));
    }

    let range = reading_range(kind, device.status)?;
    Some(ReadingValue::Numeric(rng.gen_range(range.min..range.max)))
}

/// Readings for every device in the batch, one entry per device
pub fn readings_for(devices: &[Device]) -> Vec<SimulatedReading> {
    let mut rng = rand::thread_rng();
    devices
        .iter()
        .map(|device| SimulatedReading {
            name: device.name.clone(),
            identity_key: device.identity_key.clone(),
            status: device.status,
            sensor: SensorKind::for_device_name(&device.name),
            value: simulate_reading_with(device, &mut rng),
        })
        .collect()
}
