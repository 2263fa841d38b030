//! Metadata artifact written next to each masterfile

use crate::stats::MasterfileStats;
use chrono::{DateTime, SecondsFormat, Utc};
use masterforge_common::{errors::Result, Author, CollaborationRow, FilterSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extension of the metadata artifact
pub const META_EXTENSION: &str = "meta.json";

/// Everything known about one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterfileMeta {
    pub generated_at: DateTime<Utc>,
    pub protagonist: Author,
    pub filters: FilterSpec,
    pub stats: MasterfileStats,
    pub per_paper: Vec<PaperDetail>,
}

/// Per-publication collaboration figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperDetail {
    pub identifier: String,
    pub title: String,
    pub year: i32,
    #[serde(rename = "type")]
    pub pub_type: String,
    pub coauthor_count: u32,
    pub avg_strength_in_set: f64,
    pub min_strength_in_set: f64,
    pub max_strength_in_set: f64,
    pub avg_strength_global: f64,
    pub min_strength_global: f64,
    pub max_strength_global: f64,
}

impl From<&CollaborationRow> for PaperDetail {
    fn from(row: &CollaborationRow) -> Self {
        Self {
            identifier: row.identifier.clone(),
            title: row.title.clone(),
            year: row.year,
            pub_type: row.pub_type.clone(),
            coauthor_count: row.coauthor_count,
            avg_strength_in_set: row.avg_strength_in_set,
            min_strength_in_set: row.min_strength_in_set,
            max_strength_in_set: row.max_strength_in_set,
            avg_strength_global: row.avg_strength_global,
            min_strength_global: row.min_strength_global,
            max_strength_global: row.max_strength_global,
        }
    }
}

impl MasterfileMeta {
    /// Header timestamp, RFC 3339 UTC with milliseconds
    pub fn generated_at_display(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Compact JSON of the filters for the masterfile header
    pub fn filters_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.filters)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as pretty JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
