//! Generation pipeline
//!
//! Filter → query → rows → stats + roster → masterfile lines, for one
//! protagonist. The only I/O is the single query sent through the
//! [`QueryExecutor`].

use crate::encoder::{encode, file_stem, masterfile_filename, render};
use crate::index::IndexRow;
use crate::meta::{MasterfileMeta, META_EXTENSION};
use crate::roster::{build_roster, Roster, RosterError};
use crate::stats::{aggregate, per_paper};
use chrono::{DateTime, Utc};
use masterforge_common::dblp::{build_query, normalize};
use masterforge_common::errors::{AppError, Result};
use masterforge_common::{metrics, Author, CollaborationRow, FilterSpec, Publication, QueryExecutor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// One protagonist plus the filters to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub protagonist: Author,
    #[serde(default)]
    pub filters: FilterSpec,
}

impl GenerationRequest {
    pub fn new(protagonist: Author, filters: FilterSpec) -> Self {
        Self { protagonist, filters }
    }

    /// Filters scoped to this request's protagonist
    pub fn scoped_filters(&self) -> FilterSpec {
        FilterSpec {
            protagonist_id: self.protagonist.id.clone(),
            ..self.filters.clone()
        }
    }

    /// Display name, falling back to the PID when none was given
    pub fn display_name(&self) -> &str {
        let name = self.protagonist.name.trim();
        if name.is_empty() {
            &self.protagonist.id
        } else {
            name
        }
    }
}

/// Result of one generation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub protagonist: Author,
    pub lines: Vec<String>,
    pub meta: MasterfileMeta,
    pub roster_size: usize,
    pub warnings: Vec<String>,
    pub filename: String,
}

/// Paths written by [`GenerationOutcome::write_artifacts`]
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub masterfile: PathBuf,
    pub metadata: Option<PathBuf>,
}

impl GenerationOutcome {
    /// The masterfile text
    pub fn masterfile(&self) -> String {
        render(&self.lines)
    }

    /// Whether any publication line was produced
    pub fn is_empty(&self) -> bool {
        self.meta.stats.publication_count == 0 || self.roster_size == 0
    }

    pub fn index_row(&self, testset_id: &str) -> IndexRow {
        IndexRow {
            testset_id: testset_id.to_string(),
            pid: self.protagonist.id.clone(),
            name: self.protagonist.name.clone(),
            pubs_in_filter: self.meta.stats.publication_count,
            unique_coauthors_in_filter: self.meta.stats.distinct_coauthor_count,
            avg_coauthor_strength_in_set: round2(self.meta.stats.avg_coauthor_strength_in_set),
            avg_coauthor_strength_global: round2(self.meta.stats.avg_coauthor_strength_global),
            download_name: self.filename.clone(),
        }
    }

    /// Append the PID to the filename, for a name already used in the same output
    pub fn disambiguate(&mut self) {
        let unique = format!("{} {}", self.protagonist.name, self.protagonist.id);
        self.filename = masterfile_filename(&unique);
    }

    /// Write the masterfile, and the metadata when asked, into `dir`
    pub fn write_artifacts(&self, dir: &Path, with_metadata: bool) -> Result<ArtifactPaths> {
        std::fs::create_dir_all(dir)?;

        let masterfile = dir.join(&self.filename);
        std::fs::write(&masterfile, self.masterfile())?;

        let metadata = if with_metadata {
            let stem = Path::new(&self.filename)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_stem(&self.protagonist.name));
            let path = dir.join(format!("{}.{}", stem, META_EXTENSION));
            self.meta.write(&path)?;
            Some(path)
        } else {
            None
        };

        info!(path = %masterfile.display(), "Artifacts written");
        Ok(ArtifactPaths { masterfile, metadata })
    }
}

/// Generate the masterfile for one protagonist
///
/// Transport failures propagate. Everything else (malformed or empty
/// results, a protagonist missing from the results) yields an outcome,
/// possibly empty, with a warning.
#[instrument(skip(executor, request), fields(pid = %request.protagonist.id))]
pub async fn generate(
    executor: &dyn QueryExecutor,
    request: &GenerationRequest,
    generated_at: DateTime<Utc>,
) -> Result<GenerationOutcome> {
    let start = Instant::now();
    let filters = request.scoped_filters();
    let protagonist = Author::new(request.protagonist.id.clone(), request.display_name());
    let mut warnings = Vec::new();

    let query = build_query(&filters);
    let raw_rows = executor.execute(&query).await?;

    let rows = match normalize(&raw_rows) {
        Ok(rows) => rows,
        Err(AppError::UpstreamContract { message }) => {
            warn!(error = %message, "Unusable query result, treating as no results");
            warnings.push(format!("Unusable result from {}: {}", executor.service_name(), message));
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    let stats = aggregate(&rows);
    let meta = MasterfileMeta {
        generated_at,
        protagonist: protagonist.clone(),
        filters,
        stats,
        per_paper: per_paper(&rows),
    };

    let publications = to_publications(&rows, &protagonist);
    let roster = if publications.is_empty() {
        if warnings.is_empty() {
            warnings.push("No publications match the filters".to_string());
        }
        Some(Roster::default())
    } else {
        match build_roster(&publications, &protagonist.id) {
            Ok(roster) => Some(roster),
            Err(e @ RosterError::ProtagonistNotFound { .. }) => {
                warn!(error = %e, "Skipping masterfile");
                warnings.push(e.to_string());
                None
            }
        }
    };

    let (lines, roster_size) = match &roster {
        Some(roster) => (
            encode(&publications, roster, &protagonist.name, Some(&meta)),
            roster.len(),
        ),
        None => (Vec::new(), 0),
    };

    metrics::record_generation(meta.stats.publication_count, roster_size == 0);
    info!(
        publications = meta.stats.publication_count,
        coauthors = meta.stats.distinct_coauthor_count,
        roster_size,
        lines = lines.len(),
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Masterfile generated"
    );

    Ok(GenerationOutcome {
        filename: masterfile_filename(&protagonist.name),
        protagonist,
        lines,
        meta,
        roster_size,
        warnings,
    })
}

fn to_publications(rows: &[CollaborationRow], protagonist: &Author) -> Vec<Publication> {
    rows.iter().map(|row| row.to_publication(protagonist)).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
