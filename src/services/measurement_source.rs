//! Trait for the remote air-quality data provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::fetch::FetchError;
use crate::model::Location;

/// Pollutant catalog requested for every location, in request order.
pub const MEASURES: &[&str] = &[
    "pm10",
    "pm2_5",
    "carbon_monoxide",
    "nitrogen_dioxide",
    "ozone",
    "sulphur_dioxide",
    "uv_index",
];

/// A provider of hourly air-quality series for a coordinate pair.
///
/// Implementations perform exactly one request per call. Retrying is the
/// collector's job.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Returns the provider's response body unchanged.
    async fn fetch(&self, location: &Location) -> Result<Value, FetchError>;
}
