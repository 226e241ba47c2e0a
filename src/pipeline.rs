//! Stage functions invoked by the CLI. Each stage reads the previous stage's
//! artifacts from disk, so any of them can be re-run on its own.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::analyzers::{aggregate, write_reports};
use crate::audit::{list_audit_files, read_audit_file};
use crate::classify::classify;
use crate::collector::{CollectSummary, collect_all};
use crate::config::{DataPaths, RetryPolicy};
use crate::model::{Location, Record};
use crate::normalize::normalize;
use crate::services::measurement_source::MeasurementSource;
use crate::store::Store;

/// Creates the raw, staged and reports directories.
pub fn ensure_dirs(paths: &DataPaths) -> Result<()> {
    for dir in [&paths.raw_dir, &paths.staged_dir, &paths.reports_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Fetches every location and saves the raw payloads.
pub async fn collect<S: MeasurementSource + ?Sized>(
    source: &S,
    locations: &[Location],
    policy: &RetryPolicy,
    paths: &DataPaths,
) -> Result<CollectSummary> {
    collect_all(source, locations, policy, &paths.raw_dir).await
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransformSummary {
    pub files: usize,
    pub skipped_files: usize,
    pub records: usize,
    pub appended: usize,
}

/// Normalizes and classifies every audit file, then appends the new records
/// to the dataset.
///
/// Unreadable or structurally malformed files are logged and skipped.
#[tracing::instrument(skip_all, fields(raw_dir = %paths.raw_dir.display()))]
pub fn transform(paths: &DataPaths, store: &Store) -> Result<TransformSummary> {
    let files = list_audit_files(&paths.raw_dir)?;
    let mut summary = TransformSummary {
        files: files.len(),
        ..Default::default()
    };
    if files.is_empty() {
        info!("No raw JSON files found to transform");
        return Ok(summary);
    }

    let mut records: Vec<Record> = Vec::new();
    for path in &files {
        let audit = match read_audit_file(path) {
            Ok(audit) => audit,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable audit file");
                summary.skipped_files += 1;
                continue;
            }
        };
        let payload = match audit.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(file = %audit.file_name, error = %e, "Skipping malformed payload");
                summary.skipped_files += 1;
                continue;
            }
        };
        let fallback = audit.name.as_ref().map(|n| n.location.as_str());
        match normalize(&payload, fallback) {
            Ok(observations) => {
                info!(file = %audit.file_name, rows = observations.len(), "Transformed");
                records.extend(observations.into_iter().map(classify));
            }
            Err(e) => {
                warn!(file = %audit.file_name, error = %e, "Structural error, skipping payload");
                summary.skipped_files += 1;
            }
        }
    }

    summary.records = records.len();
    summary.appended = store.append(&records)?;

    info!(
        files = summary.files,
        skipped_files = summary.skipped_files,
        records = summary.records,
        appended = summary.appended,
        dataset = %store.path().display(),
        "Transform finished"
    );
    Ok(summary)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorSummary {
    pub mirrored: usize,
    pub failed: usize,
}

/// Submits each audit file to the store's mirror sink, one at a time.
#[tracing::instrument(
    skip_all,
    fields(raw_dir = %paths.raw_dir.display(), sink = store.sink_name())
)]
pub async fn mirror(paths: &DataPaths, store: &Store) -> Result<MirrorSummary> {
    let mut summary = MirrorSummary::default();

    for path in list_audit_files(&paths.raw_dir)? {
        let audit = match read_audit_file(&path) {
            Ok(audit) => audit,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read audit file");
                summary.failed += 1;
                continue;
            }
        };
        if store.mirror(&audit).await {
            summary.mirrored += 1;
        } else {
            summary.failed += 1;
        }
    }

    info!(
        mirrored = summary.mirrored,
        failed = summary.failed,
        "Mirror step complete"
    );
    Ok(summary)
}

/// Recomputes every summary report from the dataset.
///
/// Returns the written paths; nothing is written when the dataset does not
/// exist yet.
#[tracing::instrument(skip_all, fields(reports_dir = %paths.reports_dir.display()))]
pub fn analyze(paths: &DataPaths, store: &Store) -> Result<Vec<PathBuf>> {
    if !store.exists() {
        warn!(
            dataset = %store.path().display(),
            "Transformed dataset not found, run the transform step first"
        );
        return Ok(Vec::new());
    }

    let dataset = store.read_all()?;
    info!(rows = dataset.len(), "Loaded transformed data");

    let reports = aggregate(&dataset);
    let written = write_reports(&paths.reports_dir, &reports)?;

    info!(reports = written.len(), "Analysis complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_transform_empty_raw_dir() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let store = Store::local(paths.dataset_file());

        let summary = transform(&paths, &store).unwrap();
        assert_eq!(summary, TransformSummary::default());
        assert!(!store.exists());
    }

    #[test]
    fn test_transform_skips_malformed_files() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        ensure_dirs(&paths).unwrap();
        std::fs::write(paths.raw_dir.join("Delhi_raw_20240115_000000.json"), "{ not json").unwrap();
        std::fs::write(
            paths.raw_dir.join("Mumbai_raw_20240115_000000.json"),
            r#"{"hourly": {"pm2_5": [1.0]}}"#,
        )
        .unwrap();
        std::fs::write(
            paths.raw_dir.join("Kolkata_raw_20240115_000000.json"),
            r#"{"hourly": {"time": ["2024-01-15T00:00"], "pm2_5": [12.0]}}"#,
        )
        .unwrap();
        let store = Store::local(paths.dataset_file());

        let summary = transform(&paths, &store).unwrap();
        assert_eq!(summary.files, 3);
        assert_eq!(summary.skipped_files, 2);
        assert_eq!(summary.appended, 1);
        assert_eq!(store.read_all().unwrap().records[0].location, "Kolkata");
    }

    #[test]
    fn test_analyze_without_dataset_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let store = Store::local(paths.dataset_file());

        assert!(analyze(&paths, &store).unwrap().is_empty());
        assert!(!paths.reports_dir.exists());
    }

    #[test]
    fn test_analyze_without_derived_columns_writes_remaining_reports() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        ensure_dirs(&paths).unwrap();
        std::fs::write(
            paths.dataset_file(),
            "location,timestamp,hour,pm2_5\n\
             Delhi,2024-01-15T00:00:00Z,0,40.0\n\
             Delhi,2024-01-15T01:00:00Z,1,60.0\n",
        )
        .unwrap();
        let store = Store::local(paths.dataset_file());

        let written = analyze(&paths, &store).unwrap();
        let names: Vec<_> = written
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(
            names,
            vec!["city_pollution_summary.csv", "hourly_pollution_trends.csv"]
        );
        assert!(!paths.reports_dir.join("risk_distribution.csv").exists());
    }

    #[tokio::test]
    async fn test_mirror_counts_noop_successes() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        ensure_dirs(&paths).unwrap();
        std::fs::write(paths.raw_dir.join("Delhi_raw_20240115_000000.json"), "{}").unwrap();
        std::fs::write(paths.raw_dir.join("Mumbai_raw_20240115_000000.json"), "[").unwrap();
        let store = Store::local(paths.dataset_file());

        let summary = mirror(&paths, &store).await.unwrap();
        assert_eq!(summary, MirrorSummary { mirrored: 1, failed: 1 });
    }
}
