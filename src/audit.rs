//! Raw audit files: naming convention, write-once persistence and loading.
//!
//! Audit files are named `{location}_raw_{YYYYMMDD_HHMMSS}.json`. The name is
//! the only place the fetch time is recorded, so it is handled as a small
//! serialization format rather than ad-hoc string splitting.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde_json::Value;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::model::RawPayload;

const SEPARATOR: &str = "_raw_";
const EXTENSION: &str = ".json";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuditNameError {
    #[error("audit file name must end with .json: {0}")]
    Extension(String),
    #[error("audit file name has no _raw_ separator: {0}")]
    MissingSeparator(String),
    #[error("audit file name has an empty location: {0}")]
    EmptyLocation(String),
    #[error("audit file name has an invalid fetch timestamp: {0}")]
    Timestamp(String),
}

/// Parsed form of an audit file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFileName {
    pub location: String,
    pub fetched_at: NaiveDateTime,
}

impl AuditFileName {
    pub fn new(location: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        let fetched_at = fetched_at.naive_utc();
        Self {
            location: location.into(),
            // The on-disk format has second precision.
            fetched_at: fetched_at.with_nanosecond(0).unwrap_or(fetched_at),
        }
    }
}

impl fmt::Display for AuditFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{EXTENSION}",
            self.location,
            self.fetched_at.format(TIMESTAMP_FORMAT)
        )
    }
}

impl FromStr for AuditFileName {
    type Err = AuditNameError;

    /// Splits on the last `_raw_` so location names that contain the
    /// separator still round-trip.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stem = s
            .strip_suffix(EXTENSION)
            .ok_or_else(|| AuditNameError::Extension(s.to_string()))?;
        let (location, ts) = stem
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| AuditNameError::MissingSeparator(s.to_string()))?;
        if location.is_empty() {
            return Err(AuditNameError::EmptyLocation(s.to_string()));
        }
        let fetched_at = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
            .map_err(|_| AuditNameError::Timestamp(s.to_string()))?;

        Ok(Self {
            location: location.to_string(),
            fetched_at,
        })
    }
}

/// An audit file read back from disk.
#[derive(Debug, Clone)]
pub struct AuditFile {
    pub path: PathBuf,
    pub file_name: String,
    /// `None` when the file does not follow the naming convention.
    pub name: Option<AuditFileName>,
    pub raw: Value,
}

impl AuditFile {
    /// Location recorded inside the payload, falling back to the file name.
    pub fn location(&self) -> Option<String> {
        self.raw
            .get("city")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.name.as_ref().map(|n| n.location.clone()))
    }

    pub fn payload(&self) -> Result<RawPayload> {
        serde_json::from_value(self.raw.clone())
            .with_context(|| format!("Malformed payload in {}", self.file_name))
    }
}

/// Writes `raw` verbatim as indented JSON. Fails instead of overwriting an
/// existing file.
pub fn write_audit_file(dir: &Path, name: &AuditFileName, raw: &Value) -> Result<PathBuf> {
    let path = dir.join(name.to_string());
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("Failed to create audit file {}", path.display()))?;

    let body = serde_json::to_vec_pretty(raw)?;
    file.write_all(&body)?;
    file.flush()?;

    debug!(path = %path.display(), bytes = body.len(), "Audit file written");
    Ok(path)
}

/// Lists `.json` files in `dir`, sorted by name. A missing directory is
/// treated as empty.
pub fn list_audit_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "Raw directory does not exist");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths)
}

/// Reads and parses one audit file.
pub fn read_audit_file(path: &Path) -> Result<AuditFile> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let raw: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let name = match file_name.parse::<AuditFileName>() {
        Ok(name) => Some(name),
        Err(e) => {
            debug!(error = %e, "Audit file does not follow naming convention");
            None
        }
    };

    Ok(AuditFile {
        path: path.to_path_buf(),
        file_name,
        name,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_audit_name() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 7).unwrap();
        let name = AuditFileName::new("Delhi", at);
        assert_eq!(name.to_string(), "Delhi_raw_20240115_090507.json");
    }

    #[test]
    fn test_parse_audit_name() {
        let name: AuditFileName = "Mumbai_raw_20240115_090507.json".parse().unwrap();
        assert_eq!(name.location, "Mumbai");
        assert_eq!(name.fetched_at.to_string(), "2024-01-15 09:05:07");
    }

    #[test]
    fn test_location_containing_separator_round_trips() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 7).unwrap();
        let name = AuditFileName::new("Port_raw_Town", at);
        let parsed: AuditFileName = name.to_string().parse().unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        assert!(matches!(
            "Delhi_raw_20240115_090507.txt".parse::<AuditFileName>(),
            Err(AuditNameError::Extension(_))
        ));
        assert!(matches!(
            "Delhi_20240115_090507.json".parse::<AuditFileName>(),
            Err(AuditNameError::MissingSeparator(_))
        ));
        assert!(matches!(
            "_raw_20240115_090507.json".parse::<AuditFileName>(),
            Err(AuditNameError::EmptyLocation(_))
        ));
        assert!(matches!(
            "Delhi_raw_yesterday.json".parse::<AuditFileName>(),
            Err(AuditNameError::Timestamp(_))
        ));
    }

    #[test]
    fn test_write_audit_file_is_write_once() {
        let dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let name = AuditFileName::new("Delhi", at);

        let path = write_audit_file(dir.path(), &name, &json!({"a": 1})).unwrap();
        assert!(path.exists());
        assert!(write_audit_file(dir.path(), &name, &json!({"a": 2})).is_err());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains('\n'), "audit JSON should be indented");
        assert!(content.contains("\"a\": 1"));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let files = list_audit_files(&dir.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_list_only_json_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b_raw_20240101_000000.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a_raw_20240101_000000.JSON"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = list_audit_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_location_prefers_payload_city() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Delhi_raw_20240101_000000.json");
        std::fs::write(&path, r#"{"city": "New Delhi"}"#).unwrap();
        let audit = read_audit_file(&path).unwrap();
        assert_eq!(audit.location().as_deref(), Some("New Delhi"));

        let path = dir.path().join("Kolkata_raw_20240101_000000.json");
        std::fs::write(&path, r#"{"hourly": {}}"#).unwrap();
        let audit = read_audit_file(&path).unwrap();
        assert_eq!(audit.location().as_deref(), Some("Kolkata"));
    }
}
