//! Remote collection with bounded, fixed-delay retry.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::audit::{AuditFileName, write_audit_file};
use crate::config::RetryPolicy;
use crate::fetch::FetchError;
use crate::model::Location;
use crate::services::measurement_source::MeasurementSource;

/// A location that could not be fetched within the retry budget.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch {location} after {attempts} attempt(s): {last_error}")]
pub struct DefinitiveFailure {
    pub location: String,
    pub attempts: u32,
    #[source]
    pub last_error: FetchError,
}

/// Fetches one location, retrying transient failures with a fixed pause.
#[tracing::instrument(skip(source, policy), fields(location = %location.name))]
pub async fn fetch<S: MeasurementSource + ?Sized>(
    source: &S,
    location: &Location,
    policy: &RetryPolicy,
) -> Result<Value, DefinitiveFailure> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match source.fetch(location).await {
            Ok(raw) => return Ok(raw),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %e, "Fetch failed, retrying");
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                error!(attempt, max_attempts, error = %e, "Fetch failed, giving up");
                return Err(DefinitiveFailure {
                    location: location.name.clone(),
                    attempts: attempt,
                    last_error: e,
                });
            }
        }
    }
}

/// Outcome of one collection run.
#[derive(Debug, Default)]
pub struct CollectSummary {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<String>,
}

/// Fetches every location in turn and writes each successful payload to an
/// audit file in `raw_dir`.
///
/// A location that exhausts its retries is recorded in
/// [`CollectSummary::failed`] and does not stop the run. Failing to write an
/// audit file does.
#[tracing::instrument(skip_all, fields(raw_dir = %raw_dir.display(), locations = locations.len()))]
pub async fn collect_all<S: MeasurementSource + ?Sized>(
    source: &S,
    locations: &[Location],
    policy: &RetryPolicy,
    raw_dir: &Path,
) -> Result<CollectSummary> {
    std::fs::create_dir_all(raw_dir)
        .with_context(|| format!("Failed to create raw directory {}", raw_dir.display()))?;

    let mut summary = CollectSummary::default();

    for location in locations {
        info!(
            location = %location.name,
            lat = location.latitude,
            lon = location.longitude,
            "Fetching location"
        );
        match fetch(source, location, policy).await {
            Ok(raw) => {
                let name = AuditFileName::new(&location.name, Utc::now());
                let path = write_audit_file(raw_dir, &name, &raw)?;
                info!(location = %location.name, path = %path.display(), "Saved raw payload");
                summary.saved.push(path);
            }
            Err(failure) => {
                warn!(error = %failure, "No data saved for location");
                summary.failed.push(failure.location);
            }
        }
    }

    info!(
        saved = summary.saved.len(),
        failed = summary.failed.len(),
        "Collection finished"
    );
    Ok(summary)
}
