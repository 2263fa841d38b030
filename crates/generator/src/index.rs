//! CSV index of generated masterfiles

use masterforge_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One generated masterfile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
    #[serde(rename = "TestsetID")]
    pub testset_id: String,
    #[serde(rename = "PID")]
    pub pid: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "pubsInFilter")]
    pub pubs_in_filter: usize,
    #[serde(rename = "uniqueCoauthorsInFilter")]
    pub unique_coauthors_in_filter: usize,
    #[serde(rename = "avgCoauthorStrengthInSet")]
    pub avg_coauthor_strength_in_set: f64,
    #[serde(rename = "avgCoauthorStrengthGlobal")]
    pub avg_coauthor_strength_global: f64,
    #[serde(rename = "downloadName")]
    pub download_name: String,
}

/// "<testset>_index.csv"
pub fn index_filename(testset_id: &str) -> String {
    format!("{}_index.csv", testset_id)
}

/// Render rows as CSV text with a header row
pub fn to_csv_string(rows: &[IndexRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    if rows.is_empty() {
        writer.write_record(HEADERS).map_err(csv_error)?;
    }
    let bytes = writer.into_inner().map_err(|e| AppError::Internal {
        message: format!("CSV flush failed: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

const HEADERS: [&str; 8] = [
    "TestsetID",
    "PID",
    "Name",
    "pubsInFilter",
    "uniqueCoauthorsInFilter",
    "avgCoauthorStrengthInSet",
    "avgCoauthorStrengthGlobal",
    "downloadName",
];

/// Append-only index file
pub struct IndexWriter {
    path: PathBuf,
}

impl IndexWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Index file for a testset inside `dir`
    pub fn for_testset(dir: &Path, testset_id: &str) -> Self {
        Self::new(dir.join(index_filename(testset_id)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append rows; the header is written only when the file is new or empty
    pub fn append(&self, rows: &[IndexRow]) -> Result<()> {
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        if needs_header && rows.is_empty() {
            writer.write_record(HEADERS).map_err(csv_error)?;
        }
        for row in rows {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), rows = rows.len(), needs_header, "Index rows appended");
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal {
        message: format!("CSV write failed: {}", e),
    }
}
