//! Pipeline configuration: monitored locations, retry policy, directory
//! layout and mirror selection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::Location;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read locations file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid locations file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("location name {0:?} is empty or contains a path separator")]
    InvalidName(String),
    #[error("locations file {0} lists no locations")]
    Empty(String),
    #[error("max attempts must be at least 1")]
    ZeroAttempts,
}

/// Cities collected when no locations file is given.
pub const DEFAULT_LOCATIONS: &[(&str, f64, f64)] = &[
    ("Delhi", 28.7041, 77.1025),
    ("Mumbai", 19.0760, 72.8777),
    ("Bengaluru", 12.9716, 77.5946),
    ("Hyderabad", 17.3850, 78.4867),
    ("Kolkata", 22.5726, 88.3639),
];

pub fn default_locations() -> Vec<Location> {
    DEFAULT_LOCATIONS
        .iter()
        .map(|(name, lat, lon)| Location::new(*name, *lat, *lon))
        .collect()
}

/// Loads a location catalog from a JSON file.
///
/// ```json
/// {
///   "Delhi": [28.7041, 77.1025],
///   "Mumbai": [19.0760, 72.8777]
/// }
/// ```
///
/// Locations are returned sorted by name.
pub fn load_locations(path: &Path) -> Result<Vec<Location>, ConfigError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    let entries: BTreeMap<String, (f64, f64)> =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display.clone(),
            source,
        })?;
    if entries.is_empty() {
        return Err(ConfigError::Empty(display));
    }

    entries
        .into_iter()
        .map(|(name, (lat, lon))| {
            validate_name(&name)?;
            Ok(Location::new(name, lat, lon))
        })
        .collect()
}

/// Location names end up in file names, so they must not contain separators.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Fixed-delay retry policy for the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per location, including the first.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_secs: u64, timeout_secs: u64) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(Self {
            max_attempts,
            delay: Duration::from_secs(delay_secs),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// On-disk layout under a single data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub raw_dir: PathBuf,
    pub staged_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            raw_dir: data_dir.join("raw"),
            staged_dir: data_dir.join("staged"),
            reports_dir: data_dir.join("reports"),
        }
    }

    pub fn dataset_file(&self) -> PathBuf {
        self.staged_dir.join("air_quality_transformed.csv")
    }
}

pub const DEFAULT_SINK_TABLE: &str = "air_quality_raw";

/// Which mirror sink, if any, receives raw audit payloads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SinkConfig {
    #[default]
    Disabled,
    /// PostgREST-style row store (`{url}/rest/v1/{table}`).
    RestTable {
        url: String,
        key: String,
        table: String,
    },
    /// S3 bucket, one object per audit file.
    S3 {
        bucket: String,
        prefix: String,
        gzip: bool,
    },
}

impl SinkConfig {
    /// Picks a sink from explicit settings. An S3 bucket wins over row-store
    /// credentials; incomplete row-store credentials disable mirroring.
    pub fn resolve(
        s3_bucket: Option<String>,
        gzip: bool,
        url: Option<String>,
        key: Option<String>,
        table: Option<String>,
    ) -> Self {
        if let Some(bucket) = s3_bucket.filter(|b| !b.is_empty()) {
            return SinkConfig::S3 {
                bucket,
                prefix: DEFAULT_SINK_TABLE.to_string(),
                gzip,
            };
        }
        match (url.filter(|u| !u.is_empty()), key.filter(|k| !k.is_empty())) {
            (Some(url), Some(key)) => SinkConfig::RestTable {
                url,
                key,
                table: table
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| DEFAULT_SINK_TABLE.to_string()),
            },
            _ => SinkConfig::Disabled,
        }
    }

    /// Reads `AQ_SINK_URL`, `AQ_SINK_KEY` and `AQ_SINK_TABLE`.
    pub fn from_env(s3_bucket: Option<String>, gzip: bool) -> Self {
        Self::resolve(
            s3_bucket,
            gzip,
            std::env::var("AQ_SINK_URL").ok(),
            std::env::var("AQ_SINK_KEY").ok(),
            std::env::var("AQ_SINK_TABLE").ok(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_locations() {
        let locations = default_locations();
        assert_eq!(locations.len(), 5);
        assert_eq!(locations[0], Location::new("Delhi", 28.7041, 77.1025));
    }

    #[test]
    fn test_load_locations_from_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locations.json");
        std::fs::write(&path, r#"{"Pune": [18.52, 73.85], "Agra": [27.17, 78.0]}"#).unwrap();

        let locations = load_locations(&path).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].name, "Agra");
        assert_eq!(locations[1].latitude, 18.52);
    }

    #[test]
    fn test_load_locations_rejects_bad_input() {
        let dir = TempDir::new().unwrap();

        let path = dir.path().join("slash.json");
        std::fs::write(&path, r#"{"a/b": [1.0, 2.0]}"#).unwrap();
        assert!(matches!(load_locations(&path), Err(ConfigError::InvalidName(_))));

        let path = dir.path().join("empty.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(load_locations(&path), Err(ConfigError::Empty(_))));

        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(load_locations(&path), Err(ConfigError::Parse { .. })));

        assert!(matches!(
            load_locations(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_retry_policy() {
        assert_eq!(RetryPolicy::default().max_attempts, 3);
        assert_eq!(RetryPolicy::default().delay, Duration::from_secs(5));
        assert_eq!(RetryPolicy::default().timeout, Duration::from_secs(10));
        assert!(matches!(RetryPolicy::new(0, 5, 10), Err(ConfigError::ZeroAttempts)));
    }

    #[test]
    fn test_data_paths() {
        let paths = DataPaths::new("data");
        assert_eq!(paths.raw_dir, PathBuf::from("data/raw"));
        assert_eq!(
            paths.dataset_file(),
            PathBuf::from("data/staged/air_quality_transformed.csv")
        );
    }

    #[test]
    fn test_sink_resolution() {
        assert_eq!(SinkConfig::resolve(None, false, None, None, None), SinkConfig::Disabled);
        assert_eq!(
            SinkConfig::resolve(None, false, Some("https://x.example".into()), None, None),
            SinkConfig::Disabled
        );
        assert_eq!(
            SinkConfig::resolve(
                None,
                false,
                Some("https://x.example".into()),
                Some("secret".into()),
                None
            ),
            SinkConfig::RestTable {
                url: "https://x.example".into(),
                key: "secret".into(),
                table: DEFAULT_SINK_TABLE.into(),
            }
        );
        assert_eq!(
            SinkConfig::resolve(
                Some("bucket".into()),
                true,
                Some("https://x.example".into()),
                Some("secret".into()),
                None
            ),
            SinkConfig::S3 {
                bucket: "bucket".into(),
                prefix: DEFAULT_SINK_TABLE.into(),
                gzip: true,
            }
        );
    }
}
