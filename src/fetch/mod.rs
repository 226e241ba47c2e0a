mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use serde_json::Value;

/// Failures of a single HTTP round trip.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid request URL {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Network errors, timeouts, bad statuses and garbled bodies can succeed on
    /// a later attempt. A malformed URL cannot.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::InvalidUrl(_))
    }
}

/// Maximum length of a non-success response body kept in [`FetchError::Status`].
const BODY_PREVIEW_LEN: usize = 300;

/// Executes `req`, turning non-2xx responses into [`FetchError::Status`].
pub async fn send<C: HttpClient + ?Sized>(
    client: &C,
    req: reqwest::Request,
) -> Result<reqwest::Response, FetchError> {
    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let mut body = resp.text().await.unwrap_or_default();
        if body.len() > BODY_PREVIEW_LEN {
            let mut cut = BODY_PREVIEW_LEN;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(FetchError::Status { status, body });
    }
    Ok(resp)
}

/// Executes `req` and parses the successful response body as JSON.
pub async fn fetch_json<C: HttpClient + ?Sized>(
    client: &C,
    req: reqwest::Request,
) -> Result<Value, FetchError> {
    let resp = send(client, req).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
