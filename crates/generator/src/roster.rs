//! Roster and abbreviation assignment
//!
//! The roster fixes the author order every masterfile line is encoded
//! against: protagonist first, then first appearance across publications
//! visited in year-ascending order. Writers must not re-sort it.

use masterforge_common::{Author, Publication};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Abbreviation base for authors without a usable display name
pub const UNNAMED_BASE: &str = "NN";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("Protagonist {id} does not appear on any publication")]
    ProtagonistNotFound { id: String },
}

/// One roster position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub abbreviation: String,
    pub full_name: String,
}

/// Ordered, abbreviation-unique author list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    index: HashMap<String, usize>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&RosterEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// The protagonist's entry, always at position 0
    pub fn protagonist(&self) -> Option<&RosterEntry> {
        self.entries.first()
    }

    /// Abbreviations in roster order
    pub fn abbreviations(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.abbreviation.as_str())
    }

    fn from_entries(entries: Vec<RosterEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Self { entries, index }
    }
}

/// Build the roster for `protagonist_id` from its publications
///
/// Returns [`RosterError::ProtagonistNotFound`] when the protagonist is on
/// none of the publications, including when there are none.
pub fn build_roster(publications: &[Publication], protagonist_id: &str) -> Result<Roster, RosterError> {
    let mut ordered: Vec<&Publication> = publications.iter().collect();
    ordered.sort_by_key(|p| p.year);

    let mut entries: Vec<RosterEntry> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut used: HashSet<String> = HashSet::new();

    for author in ordered.iter().flat_map(|p| p.authors.iter()) {
        if !seen.insert(author.id.as_str()) {
            continue;
        }
        let abbreviation = unique_abbreviation(&abbreviation_base(&author.name), &used);
        used.insert(abbreviation.clone());
        entries.push(entry(author, abbreviation));
    }

    let position = entries
        .iter()
        .position(|e| e.id == protagonist_id)
        .ok_or_else(|| RosterError::ProtagonistNotFound {
            id: protagonist_id.to_string(),
        })?;
    let protagonist = entries.remove(position);
    entries.insert(0, protagonist);

    Ok(Roster::from_entries(entries))
}

/// Upper-cased first letter of every whitespace-separated name token
pub fn abbreviation_base(name: &str) -> String {
    let base: String = name
        .split_whitespace()
        .filter_map(|token| token.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    if base.is_empty() {
        UNNAMED_BASE.to_string()
    } else {
        base
    }
}

fn unique_abbreviation(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn entry(author: &Author, abbreviation: String) -> RosterEntry {
    RosterEntry {
        id: author.id.clone(),
        abbreviation,
        full_name: author.name.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(year: i32, authors: &[(&str, &str)]) -> Publication {
        Publication {
            identifier: format!("pub-{}", year),
            year,
            pub_type: None,
            authors: authors.iter().map(|(id, name)| Author::new(*id, *name)).collect(),
            title: None,
        }
    }

    #[test]
    fn test_abbreviation_base() {
        assert_eq!(abbreviation_base("Ann Bee"), "AB");
        assert_eq!(abbreviation_base("  jean   claude van damme "), "JCVD");
        assert_eq!(abbreviation_base("Élodie Ünal"), "ÉÜ");
        assert_eq!(abbreviation_base(""), "NN");
        assert_eq!(abbreviation_base("   "), "NN");
    }

    #[test]
    fn test_protagonist_first_and_first_appearance_order() {
        let publications = vec![
            publication(2020, &[("c2", "Ed Eff"), ("p1", "Ann Bee")]),
            publication(2019, &[("c1", "Cy Dee"), ("p1", "Ann Bee")]),
        ];
        let roster = build_roster(&publications, "p1").unwrap();
        let ids: Vec<&str> = roster.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "c1", "c2"]);
        assert_eq!(roster.protagonist().unwrap().abbreviation, "AB");
    }

    #[test]
    fn test_collisions_get_smallest_free_suffix() {
        let publications = vec![publication(
            2020,
            &[("p1", "Ann Bee"), ("a", "John Smith"), ("b", "Jane Stone"), ("c", "Jo Sun")],
        )];
        let roster = build_roster(&publications, "p1").unwrap();
        let abbreviations: Vec<&str> = roster.abbreviations().collect();
        assert_eq!(abbreviations, vec!["AB", "JS", "JS1", "JS2"]);
    }

    #[test]
    fn test_suffix_skips_names_already_taken() {
        // "JS1" is someone's real base, so the second JS becomes JS2
        let publications = vec![publication(
            2020,
            &[("p1", "Ann Bee"), ("a", "John Smith"), ("b", "J S 1"), ("c", "Jane Stone")],
        )];
        let roster = build_roster(&publications, "p1").unwrap();
        assert_eq!(roster.get("b").unwrap().abbreviation, "JS1");
        assert_eq!(roster.get("c").unwrap().abbreviation, "JS2");
    }

    #[test]
    fn test_abbreviations_are_unique() {
        let names = ["Al Bo", "Ay Be", "Al Bo", "A B", "", " ", "Ab"];
        let authors: Vec<(String, &str)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (format!("a{}", i), *n))
            .collect();
        let mut list: Vec<(&str, &str)> = vec![("p1", "Ann Bee")];
        list.extend(authors.iter().map(|(id, n)| (id.as_str(), *n)));
        let roster = build_roster(&[publication(2000, &list)], "p1").unwrap();

        let unique: HashSet<&str> = roster.abbreviations().collect();
        assert_eq!(unique.len(), roster.len());
        assert_eq!(roster.get("a4").unwrap().abbreviation, "NN");
        assert_eq!(roster.get("a5").unwrap().abbreviation, "NN1");
        assert_eq!(roster.get("a4").unwrap().full_name, "");
    }

    #[test]
    fn test_protagonist_moved_from_later_position() {
        let publications = vec![
            publication(2018, &[("c1", "Cy Dee")]),
            publication(2021, &[("c1", "Cy Dee"), ("p1", "Ann Bee")]),
        ];
        let roster = build_roster(&publications, "p1").unwrap();
        let ids: Vec<&str> = roster.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "c1"]);
        assert_eq!(roster.get("c1").unwrap().full_name, "Cy Dee");
    }

    #[test]
    fn test_independent_of_input_order() {
        let a = publication(2019, &[("p1", "Ann Bee"), ("x", "Jo Smith")]);
        let b = publication(2020, &[("p1", "Ann Bee"), ("y", "Jay Stone")]);
        let forward = build_roster(&[a.clone(), b.clone()], "p1").unwrap();
        let backward = build_roster(&[b, a], "p1").unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.get("y").unwrap().abbreviation, "JS1");
    }

    #[test]
    fn test_missing_protagonist() {
        let publications = vec![publication(2020, &[("c1", "Cy Dee")])];
        assert_eq!(
            build_roster(&publications, "p1"),
            Err(RosterError::ProtagonistNotFound { id: "p1".into() })
        );
        assert!(build_roster(&[], "p1").is_err());
    }
}
