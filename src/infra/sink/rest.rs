use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, send};
use crate::services::mirror_sink::{MirrorRow, MirrorSink};

/// Mirrors rows into a PostgREST-style table (`POST {url}/rest/v1/{table}`).
pub struct RestTableSink<C> {
    endpoint: reqwest::Url,
    client: C,
}

impl RestTableSink<ApiKey<ApiKey<BasicClient>>> {
    /// Authenticates with the service key both as `apikey` and as a bearer
    /// token, which is what hosted PostgREST gateways expect.
    pub fn connect(url: &str, key: &str, table: &str) -> Result<Self> {
        let client = ApiKey::bearer(ApiKey::new(BasicClient::new(), "apikey", key)?, key)?;
        Self::with_client(client, url, table)
    }
}

impl<C: HttpClient> RestTableSink<C> {
    pub fn with_client(client: C, url: &str, table: &str) -> Result<Self> {
        let endpoint = format!("{}/rest/v1/{}", url.trim_end_matches('/'), table);
        let endpoint = reqwest::Url::parse(&endpoint)
            .with_context(|| format!("Invalid mirror endpoint {endpoint}"))?;
        Ok(Self { endpoint, client })
    }

    fn request(&self, row: &MirrorRow) -> Result<reqwest::Request> {
        let mut req = reqwest::Request::new(reqwest::Method::POST, self.endpoint.clone());
        let headers = req.headers_mut();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            "prefer",
            reqwest::header::HeaderValue::from_static("return=minimal"),
        );
        *req.body_mut() = Some(serde_json::to_vec(row)?.into());
        Ok(req)
    }
}

#[async_trait]
impl<C: HttpClient> MirrorSink for RestTableSink<C> {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn insert(&self, row: &MirrorRow) -> Result<()> {
        let req = self.request(row)?;
        send(&self.client, req)
            .await
            .with_context(|| format!("Insert of {} failed", row.filename))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> MirrorRow {
        MirrorRow {
            filename: "Delhi_raw_20240115_090000.json".into(),
            city: Some("Delhi".into()),
            fetched_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
                .and_then(|d| d.and_hms_opt(9, 0, 0)),
            data: json!({"hourly": {}}),
        }
    }

    #[test]
    fn test_request_targets_table() {
        let sink =
            RestTableSink::connect("https://db.example.com/", "k", "air_quality_raw").unwrap();
        let req = sink.request(&row()).unwrap();

        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(
            req.url().as_str(),
            "https://db.example.com/rest/v1/air_quality_raw"
        );
        assert_eq!(req.headers()["prefer"], "return=minimal");

        let body: serde_json::Value =
            serde_json::from_slice(req.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["city"], "Delhi");
        assert_eq!(body["fetched_at"], "2024-01-15T09:00:00");
        assert_eq!(body["filename"], "Delhi_raw_20240115_090000.json");
    }

    #[test]
    fn test_connect_rejects_unusable_key() {
        assert!(RestTableSink::connect("https://db.example.com", "bad\nkey", "t").is_err());
    }
}
