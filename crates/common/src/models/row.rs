//! Typed result row, one per publication

use super::{Author, Publication, PublicationType};
use serde::{Deserialize, Serialize};

/// A normalized SPARQL result row
///
/// `coauthor_names` and `coauthor_ids` always have the same length and order.
/// The protagonist is never among the coauthors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationRow {
    /// Publication IRI
    pub identifier: String,
    pub title: String,
    pub year: i32,
    /// Schema local name ("Article", ...), empty when missing
    #[serde(rename = "type")]
    pub pub_type: String,

    pub coauthor_names: Vec<String>,
    pub coauthor_ids: Vec<String>,
    pub coauthor_count: u32,

    pub avg_strength_in_set: f64,
    pub min_strength_in_set: f64,
    pub max_strength_in_set: f64,

    pub avg_strength_global: f64,
    pub min_strength_global: f64,
    pub max_strength_global: f64,
}

impl CollaborationRow {
    /// Coauthors as (id, name) pairs in result order
    pub fn coauthors(&self) -> impl Iterator<Item = Author> + '_ {
        self.coauthor_ids
            .iter()
            .zip(self.coauthor_names.iter())
            .map(|(id, name)| Author::new(id.clone(), name.clone()))
    }

    /// Convert into a publication with the protagonist listed first
    pub fn to_publication(&self, protagonist: &Author) -> Publication {
        let mut authors = Vec::with_capacity(self.coauthor_ids.len() + 1);
        authors.push(protagonist.clone());
        for coauthor in self.coauthors() {
            if !authors.iter().any(|a: &Author| a.id == coauthor.id) {
                authors.push(coauthor);
            }
        }

        Publication {
            identifier: self.identifier.clone(),
            year: self.year,
            pub_type: self.pub_type.parse::<PublicationType>().ok(),
            authors,
            title: Some(self.title.clone()).filter(|t| !t.is_empty()),
        }
    }
}
