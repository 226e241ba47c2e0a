//! Synthetic 24-hour payloads for running the pipeline offline.

use anyhow::Result;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzers::utility::round2;
use crate::audit::{AuditFileName, write_audit_file};
use crate::model::Location;

const HOURS: usize = 24;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Deterministic hourly series ending at the hour containing `now`.
pub fn sample_payload(location: &Location, now: DateTime<Utc>) -> Value {
    let base = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
    let series = |f: &dyn Fn(f64) -> f64| -> Vec<f64> {
        (0..HOURS).map(|i| f(i as f64)).collect()
    };

    let time: Vec<String> = (0..HOURS)
        .map(|i| {
            let t = base - Duration::hours((HOURS - 1 - i) as i64);
            t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
        })
        .collect();

    json!({
        "city": location.name,
        "latitude": location.latitude,
        "longitude": location.longitude,
        "hourly": {
            "time": time,
            "pm2_5": series(&|i| round2(40.0 + (i % 8.0) * 2.0 + i / 24.0)),
            "pm10": series(&|i| round2(60.0 + (i % 6.0) * 3.0 + i / 24.0)),
            "carbon_monoxide": series(&|i| round3(0.2 + (i % 5.0) * 0.05)),
            "nitrogen_dioxide": series(&|i| round2(15.0 + (i % 7.0) * 2.0)),
            "ozone": series(&|i| round2(10.0 + (i % 6.0) * 1.5)),
            "sulphur_dioxide": series(&|i| round2(5.0 + (i % 4.0) * 0.8)),
            "uv_index": series(&|i| round2((5.0 - (12.0 - i).abs() / 3.0).max(0.0))),
        }
    })
}

/// Writes one sample audit file per location into `raw_dir`.
pub fn write_samples(
    locations: &[Location],
    raw_dir: &Path,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(raw_dir)?;

    let mut written = Vec::with_capacity(locations.len());
    for location in locations {
        let name = AuditFileName::new(&location.name, now);
        let path = write_audit_file(raw_dir, &name, &sample_payload(location, now))?;
        info!(path = %path.display(), "Wrote sample payload");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawPayload;
    use crate::normalize::normalize;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_sample_payload_shape() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 34, 56).unwrap();
        let raw = sample_payload(&Location::new("Delhi", 28.7, 77.1), now);

        let time = raw["hourly"]["time"].as_array().unwrap();
        assert_eq!(time.len(), 24);
        assert_eq!(time[0], "2024-01-14T13:00:00Z");
        assert_eq!(time[23], "2024-01-15T12:00:00Z");
        assert_eq!(raw["hourly"]["pm2_5"][0], 40.0);
        assert_eq!(raw["hourly"]["pm2_5"][1], 42.04);
        assert_eq!(raw["hourly"]["uv_index"][12], 5.0);
        assert_eq!(raw["hourly"]["uv_index"][0], 1.0);
    }

    #[test]
    fn test_samples_normalize_cleanly() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let raw = sample_payload(&Location::new("Delhi", 28.7, 77.1), now);
        let payload: RawPayload = serde_json::from_value(raw).unwrap();

        let obs = normalize(&payload, None).unwrap();
        assert_eq!(obs.len(), 24);
        assert_eq!(obs[23].hour, Some(12));
    }

    #[test]
    fn test_write_samples_one_file_per_location() {
        let dir = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let locations = vec![
            Location::new("Delhi", 28.7, 77.1),
            Location::new("Mumbai", 19.0, 72.8),
        ];

        let paths = write_samples(&locations, dir.path(), now).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("Mumbai_raw_20240115_120000.json"));
    }
}
