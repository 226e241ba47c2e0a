//! Trait for the optional external replica of raw audit payloads.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::audit::AuditFile;

/// One mirrored audit file.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorRow {
    pub filename: String,
    pub city: Option<String>,
    pub fetched_at: Option<NaiveDateTime>,
    pub data: Value,
}

impl MirrorRow {
    pub fn from_audit(audit: &AuditFile) -> Self {
        Self {
            filename: audit.file_name.clone(),
            city: audit.location(),
            fetched_at: audit.name.as_ref().map(|n| n.fetched_at),
            data: audit.raw.clone(),
        }
    }
}

/// Destination for mirrored rows. Each call is an independent insert.
#[async_trait]
pub trait MirrorSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn insert(&self, row: &MirrorRow) -> Result<()>;
}

/// Sink used when no mirror is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl MirrorSink for NoopSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn insert(&self, _row: &MirrorRow) -> Result<()> {
        Ok(())
    }
}
