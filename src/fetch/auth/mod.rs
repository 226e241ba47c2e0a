//! [`HttpClient`](super::HttpClient) wrappers that attach credentials.

mod api_key;
mod url_param;

pub use api_key::{ApiKey, ApiKeyError};
pub use url_param::UrlParam;
