use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;

use crate::services::mirror_sink::{MirrorRow, MirrorSink};

/// Mirrors each row as a JSON object under `{prefix}/{filename}`, optionally
/// gzip-compressed.
pub struct S3Sink {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    gzip: bool,
}

impl S3Sink {
    /// Uses the ambient AWS configuration (env vars, profile, instance role).
    pub async fn from_env(bucket: String, prefix: String, gzip: bool) -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket,
            prefix,
            gzip,
        }
    }
}

/// Object key and body for `row`.
pub(crate) fn encode(row: &MirrorRow, prefix: &str, gzip: bool) -> Result<(String, Vec<u8>)> {
    let json = serde_json::to_vec(row)?;
    let prefix = prefix.trim_end_matches('/');

    if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok((format!("{prefix}/{}.gz", row.filename), encoder.finish()?))
    } else {
        Ok((format!("{prefix}/{}", row.filename), json))
    }
}

#[async_trait]
impl MirrorSink for S3Sink {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn insert(&self, row: &MirrorRow) -> Result<()> {
        let (key, body) = encode(row, &self.prefix, self.gzip)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use serde_json::json;
    use std::io::Read;

    fn row() -> MirrorRow {
        MirrorRow {
            filename: "Delhi_raw_20240115_090000.json".into(),
            city: Some("Delhi".into()),
            fetched_at: None,
            data: json!({"hourly": {"time": []}}),
        }
    }

    #[test]
    fn test_encode_plain() {
        let (key, body) = encode(&row(), "air_quality_raw/", false).unwrap();
        assert_eq!(key, "air_quality_raw/Delhi_raw_20240115_090000.json");
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["city"], "Delhi");
        assert!(value["fetched_at"].is_null());
    }

    #[test]
    fn test_encode_gzip() {
        let (key, body) = encode(&row(), "air_quality_raw", true).unwrap();
        assert_eq!(key, "air_quality_raw/Delhi_raw_20240115_090000.json.gz");

        let mut decoded = String::new();
        GzDecoder::new(body.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.contains("\"filename\":\"Delhi_raw_20240115_090000.json\""));
    }
}
