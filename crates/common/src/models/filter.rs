//! Filters over a protagonist's publication set

use super::PublicationType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Declarative filter turned into a SPARQL query by [`crate::dblp::build_query`]
///
/// `year_min <= year_max` is the caller's responsibility. Counts are unsigned,
/// so negative inputs must be clamped before they get here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// dblp PID of the protagonist
    pub protagonist_id: String,

    /// Publication types; empty means Article + Inproceedings
    #[serde(default)]
    pub types: BTreeSet<PublicationType>,

    /// Stream suffix such as "conf/icse" or "journals/tse"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_suffix: Option<String>,

    /// Minimum joint publications in the set for a coauthor to be kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_coauthor_publications_in_set: Option<u32>,

    /// Keep only the K strongest coauthors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_top_k_coauthors: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
}

impl FilterSpec {
    pub fn for_protagonist(protagonist_id: impl Into<String>) -> Self {
        Self {
            protagonist_id: protagonist_id.into(),
            ..Default::default()
        }
    }

    /// Types to query, applying the default when none are set
    pub fn effective_types(&self) -> Vec<PublicationType> {
        if self.types.is_empty() {
            PublicationType::DEFAULT.to_vec()
        } else {
            self.types.iter().copied().collect()
        }
    }

    /// Venue suffix, ignoring blank values
    pub fn venue(&self) -> Option<&str> {
        self.venue_suffix
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn min_coauthor_publications(&self) -> u32 {
        self.min_coauthor_publications_in_set.unwrap_or(0)
    }

    pub fn top_k(&self) -> u32 {
        self.focus_top_k_coauthors.unwrap_or(0)
    }

    /// Clamp a signed count from an outer surface into the unsigned domain
    pub fn clamp_count(value: Option<i64>) -> Option<u32> {
        value.map(|v| v.clamp(0, u32::MAX as i64) as u32)
    }
}
