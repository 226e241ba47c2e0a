//! Core data types shared by every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A monitored city with fixed coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// Unprocessed measurement arrays from one fetch.
///
/// Only the fields the normalizer reads are typed; everything else the source
/// returns (units, generation time, timezone, ...) is kept in `extra` so the
/// payload can be written back out unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly: Option<HourlySeries>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parallel hourly sequences keyed by measure name.
///
/// Values stay as raw JSON so that nulls and stray strings survive until the
/// normalizer decides what to do with them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlySeries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm10: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm2_5: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbon_monoxide: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nitrogen_dioxide: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sulphur_dioxide: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ozone: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The seven numeric measures carried by every record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurements {
    pub pm10: Option<f64>,
    pub pm2_5: Option<f64>,
    pub carbon_monoxide: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub sulphur_dioxide: Option<f64>,
    pub ozone: Option<f64>,
    pub uv_index: Option<f64>,
}

impl Measurements {
    /// The six pollutants that count towards severity. UV index is excluded.
    pub fn core(&self) -> [Option<f64>; 6] {
        [
            self.pm10,
            self.pm2_5,
            self.carbon_monoxide,
            self.nitrogen_dioxide,
            self.sulphur_dioxide,
            self.ozone,
        ]
    }

    pub fn all_core_missing(&self) -> bool {
        self.core().iter().all(Option::is_none)
    }
}

/// A normalized row that has not been classified yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub location: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub hour: Option<u32>,
    pub measurements: Measurements,
}

/// Five-level classification derived from PM2.5 alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    Unhealthy,
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

/// Three-level classification derived from severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskTier {
    #[default]
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Moderate => "Moderate Risk",
            RiskTier::High => "High Risk",
        }
    }
}

/// One normalized, classified observation. Field order is the column order of
/// the durable dataset.
///
/// Only `location` is required when reading; a dataset missing the derived
/// columns still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub location: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub hour: Option<u32>,
    pub pm10: Option<f64>,
    pub pm2_5: Option<f64>,
    pub carbon_monoxide: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub sulphur_dioxide: Option<f64>,
    pub ozone: Option<f64>,
    pub uv_index: Option<f64>,
    pub aqi: Option<AqiCategory>,
    #[serde(default)]
    pub severity: f64,
    #[serde(default)]
    pub risk: RiskTier,
}

/// Deduplication key of the durable dataset.
///
/// Dated rows are unique per (location, timestamp). Undated rows have no
/// natural identity, so they are keyed by their readings and compared as a
/// multiset: repeated identical undated rows are all kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Dated(String, DateTime<Utc>),
    Undated(String, [Option<u64>; 7]),
}

impl RecordKey {
    pub fn is_dated(&self) -> bool {
        matches!(self, RecordKey::Dated(..))
    }
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self.timestamp {
            Some(ts) => RecordKey::Dated(self.location.clone(), ts),
            None => RecordKey::Undated(
                self.location.clone(),
                [
                    self.pm10,
                    self.pm2_5,
                    self.carbon_monoxide,
                    self.nitrogen_dioxide,
                    self.sulphur_dioxide,
                    self.ozone,
                    self.uv_index,
                ]
                .map(|v| v.map(f64::to_bits)),
            ),
        }
    }
}
