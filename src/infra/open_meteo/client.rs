use async_trait::async_trait;
use serde_json::Value;

use crate::fetch::{FetchError, HttpClient, fetch_json};
use crate::model::Location;
use crate::services::measurement_source::{MEASURES, MeasurementSource};

pub const DEFAULT_BASE_URL: &str = "https://air-quality-api.open-meteo.com";

/// Open-Meteo air-quality API.
///
/// Requests hourly values for yesterday and today, which always covers the
/// most recent 24 hours regardless of the time of day the run starts.
pub struct OpenMeteoSource {
    base_url: String,
    client: Box<dyn HttpClient>,
}

impl OpenMeteoSource {
    pub fn new(client: Box<dyn HttpClient>) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: Box<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn request_url(&self, location: &Location) -> Result<reqwest::Url, FetchError> {
        let endpoint = format!("{}/v1/air-quality", self.base_url);
        let mut url = reqwest::Url::parse(&endpoint)
            .map_err(|e| FetchError::InvalidUrl(format!("{endpoint}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("latitude", &location.latitude.to_string())
            .append_pair("longitude", &location.longitude.to_string())
            .append_pair("hourly", &MEASURES.join(","))
            .append_pair("past_days", "1")
            .append_pair("forecast_days", "1");
        Ok(url)
    }
}

#[async_trait]
impl MeasurementSource for OpenMeteoSource {
    async fn fetch(&self, location: &Location) -> Result<Value, FetchError> {
        let url = self.request_url(location)?;
        let req = reqwest::Request::new(reqwest::Method::GET, url);
        fetch_json(self.client.as_ref(), req).await
    }
}
