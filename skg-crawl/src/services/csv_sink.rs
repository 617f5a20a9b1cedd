//! Per-entity CSV output
//!
//! One file per entity with data: `<dir>/<entity>.csv`, header taken from the
//! first record, one row per record. Empty sets produce no file. Rows are
//! rendered in memory and written in one call, so a rerun over the same
//! records produces a byte-identical file.

use crate::error::SinkError;
use crate::types::EntityResultSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of persisting one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Written { path: PathBuf, rows: usize },
    /// Empty set, nothing written
    Skipped,
}

/// Destination for entity result sets
pub trait ResultSink: Send + Sync {
    fn persist(&self, set: &EntityResultSet) -> Result<SinkOutcome, SinkError>;
}

/// Writes `<dir>/<entity>.csv`
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    /// Create the output directory if needed
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Output directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for an entity, rejecting identifiers that are not plain file names
    pub fn path_for(&self, entity: &str) -> Result<PathBuf, SinkError> {
        validate_file_stem(entity)?;
        Ok(self.dir.join(format!("{}.csv", entity)))
    }
}

impl ResultSink for CsvSink {
    fn persist(&self, set: &EntityResultSet) -> Result<SinkOutcome, SinkError> {
        let first = match set.records.first() {
            Some(first) => first,
            None => {
                info!(entity = %set.entity, source = %set.source, "No records, skipping file");
                return Ok(SinkOutcome::Skipped);
            }
        };

        let path = self.path_for(&set.entity)?;
        let header: Vec<&str> = first.field_names().collect();

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&header)?;

        for record in &set.records {
            if !record.field_names().eq(header.iter().copied()) {
                return Err(SinkError::SchemaMismatch {
                    expected: header.iter().map(|s| s.to_string()).collect(),
                    found: record.field_names().map(str::to_string).collect(),
                });
            }
            writer.write_record(record.values())?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))?;
        fs::write(&path, bytes)?;

        info!(
            entity = %set.entity,
            source = %set.source,
            rows = set.records.len(),
            path = %path.display(),
            "Saved records"
        );
        Ok(SinkOutcome::Written {
            path,
            rows: set.records.len(),
        })
    }
}

fn validate_file_stem(entity: &str) -> Result<(), SinkError> {
    let invalid = entity.trim().is_empty()
        || entity == "."
        || entity == ".."
        || entity
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control());

    if invalid {
        Err(SinkError::InvalidFileName(entity.to_string()))
    } else {
        Ok(())
    }
}
