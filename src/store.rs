//! Durable CSV dataset of classified records, plus the optional mirror.
//!
//! The dataset is append-only. Every append first loads the keys already on
//! disk so re-processing the same audit files never duplicates a
//! (location, timestamp) row.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::audit::AuditFile;
use crate::model::{Record, RecordKey};
use crate::services::mirror_sink::{MirrorRow, MirrorSink, NoopSink};

/// Full contents of the durable dataset.
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    /// Header row as found on disk.
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct Store {
    path: PathBuf,
    sink: Box<dyn MirrorSink>,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>, sink: Box<dyn MirrorSink>) -> Self {
        Self {
            path: path.into(),
            sink,
        }
    }

    /// Store without a mirror.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Box::new(NoopSink))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Appends the records whose key is not already present, including
    /// duplicates within `records` itself. Returns how many rows were written.
    ///
    /// Dated keys are unique. Undated keys are counted: the n-th identical
    /// undated row in `records` is written only if the dataset holds fewer
    /// than n of them, so passing the full set of rows again writes nothing.
    ///
    /// Creates the file, its parent directory and the header row on first use.
    pub fn append(&self, records: &[Record]) -> Result<usize> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let on_disk = self.existing_keys()?;
        let mut in_batch: HashMap<RecordKey, usize> = HashMap::new();
        let fresh: Vec<&Record> = records
            .iter()
            .filter(|r| {
                let key = r.key();
                let stored = on_disk.get(&key).copied().unwrap_or(0);
                let n = in_batch.entry(key.clone()).or_default();
                *n += 1;
                *n > stored && (*n == 1 || !key.is_dated())
            })
            .collect();
        let skipped = records.len() - fresh.len();

        if fresh.is_empty() {
            debug!(skipped, "Nothing new to append");
            return Ok(0);
        }

        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        debug!(path = %self.path.display(), needs_header, "Appending CSV records");

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open dataset {}", self.path.display()))?;

        let mut writer = WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        for record in &fresh {
            writer.serialize(record)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write dataset {}", self.path.display()))?;

        info!(appended = fresh.len(), skipped, "Dataset updated");
        Ok(fresh.len())
    }

    /// Reads every row. A missing file is an empty dataset.
    pub fn read_all(&self) -> Result<Dataset> {
        if !self.path.exists() {
            return Ok(Dataset::default());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open dataset {}", self.path.display()))?;
        let mut rdr = csv::Reader::from_reader(file);
        let columns = rdr.headers()?.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        for result in rdr.deserialize() {
            let record: Record =
                result.with_context(|| format!("Corrupt row in {}", self.path.display()))?;
            records.push(record);
        }

        Ok(Dataset { columns, records })
    }

    /// Occurrences of each key already in the dataset.
    fn existing_keys(&self) -> Result<HashMap<RecordKey, usize>> {
        let mut counts = HashMap::new();
        for record in self.read_all()?.records {
            *counts.entry(record.key()).or_default() += 1;
        }
        Ok(counts)
    }

    /// Sends one audit file to the mirror sink. Failures are logged and
    /// reported as `false`; they never touch the local dataset.
    pub async fn mirror(&self, audit: &AuditFile) -> bool {
        let row = MirrorRow::from_audit(audit);
        match self.sink.insert(&row).await {
            Ok(()) => {
                debug!(sink = self.sink.name(), file = %audit.file_name, "Mirrored");
                true
            }
            Err(e) => {
                warn!(
                    sink = self.sink.name(),
                    file = %audit.file_name,
                    error = %e,
                    "Mirror insert failed, skipping"
                );
                false
            }
        }
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }
}
