//! Concrete mirror sinks and their selection from [`SinkConfig`].

mod rest;
mod s3;

pub use rest::RestTableSink;
pub use s3::S3Sink;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::SinkConfig;
use crate::services::mirror_sink::{MirrorSink, NoopSink};

/// Builds the sink selected by `config`. Disabled mirroring yields a
/// [`NoopSink`].
pub async fn build_sink(config: &SinkConfig) -> Result<Box<dyn MirrorSink>> {
    let sink: Box<dyn MirrorSink> = match config {
        SinkConfig::Disabled => Box::new(NoopSink),
        SinkConfig::RestTable { url, key, table } => {
            Box::new(RestTableSink::connect(url, key, table)?)
        }
        SinkConfig::S3 {
            bucket,
            prefix,
            gzip,
        } => Box::new(S3Sink::from_env(bucket.clone(), prefix.clone(), *gzip).await),
    };
    info!(sink = sink.name(), "Mirror sink configured");
    Ok(sink)
}

/// Like [`build_sink`], but a sink that cannot be built is logged and replaced
/// by a [`NoopSink`]. Mirroring never stops the pipeline.
pub async fn build_sink_or_noop(config: &SinkConfig) -> Box<dyn MirrorSink> {
    match build_sink(config).await {
        Ok(sink) => sink,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Mirror sink unavailable, continuing without it");
            Box::new(NoopSink)
        }
    }
}
