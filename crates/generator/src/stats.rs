//! Collaboration statistics over a protagonist's result rows

use crate::meta::PaperDetail;
use masterforge_common::CollaborationRow;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Aggregate figures for one masterfile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterfileStats {
    pub publication_count: usize,
    pub distinct_coauthor_count: usize,
    /// Row count per raw type name, sorted by name
    pub by_type: BTreeMap<String, usize>,
    pub avg_coauthor_strength_in_set: f64,
    pub avg_coauthor_strength_global: f64,
}

impl MasterfileStats {
    /// "12 Article, 3 Inproceedings"
    pub fn breakdown(&self) -> String {
        self.by_type
            .iter()
            .map(|(t, count)| format!("{} {}", count, t))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Aggregate rows into masterfile statistics. Empty input yields zeros.
pub fn aggregate(rows: &[CollaborationRow]) -> MasterfileStats {
    let mut by_type = BTreeMap::new();
    let mut coauthors: HashSet<&str> = HashSet::new();

    for row in rows {
        *by_type.entry(row.pub_type.clone()).or_insert(0) += 1;
        coauthors.extend(row.coauthor_ids.iter().map(String::as_str));
    }

    MasterfileStats {
        publication_count: rows.len(),
        distinct_coauthor_count: coauthors.len(),
        by_type,
        avg_coauthor_strength_in_set: mean(rows.iter().map(|r| r.avg_strength_in_set)),
        avg_coauthor_strength_global: mean(rows.iter().map(|r| r.avg_strength_global)),
    }
}

/// Project rows into per-paper metadata entries, in row order
pub fn per_paper(rows: &[CollaborationRow]) -> Vec<PaperDetail> {
    rows.iter().map(PaperDetail::from).collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
