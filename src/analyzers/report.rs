use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzers::types::SummaryReport;

/// Writes `report` to its file in `dir`, replacing any previous version.
pub fn write_report(dir: &Path, report: &SummaryReport) -> Result<PathBuf> {
    let path = dir.join(report.file_name());
    let written = match report {
        SummaryReport::LocationSummary(rows) => write_rows(&path, report.headers(), rows),
        SummaryReport::CategoryDistribution(rows) | SummaryReport::RiskDistribution(rows) => {
            write_rows(&path, report.headers(), rows)
        }
        SummaryReport::HourlyTrend(rows) => write_rows(&path, report.headers(), rows),
    };
    written.with_context(|| format!("Failed to write report {}", path.display()))?;

    info!(path = %path.display(), rows = report.len(), "Report saved");
    Ok(path)
}

/// Writes every report into `dir`, creating it if needed.
pub fn write_reports(dir: &Path, reports: &[SummaryReport]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create reports directory {}", dir.display()))?;
    reports.iter().map(|r| write_report(dir, r)).collect()
}

/// Header is written explicitly so empty reports still carry one.
fn write_rows<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
