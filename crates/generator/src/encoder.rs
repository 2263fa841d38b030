//! Masterfile encoding
//!
//! One line per publication, year ascending:
//!
//! ```text
//! t2019 : AB;CD : AB,CD
//! t2020 : AB,CD : AB,CD
//! ```
//!
//! Present abbreviations come first, then `;`-joined missing ones (only when
//! some are missing), then the whole roster.

use crate::meta::MasterfileMeta;
use crate::roster::Roster;
use masterforge_common::Publication;
use std::collections::HashSet;

pub const BANNER: &str = "* Generated using the DBLP Master-Generator inspired by Tim Hegemann";

/// Extension of the masterfile artifact
pub const MASTERFILE_EXTENSION: &str = "master";

/// Encode publications against a roster. Deterministic for identical input.
pub fn encode(
    publications: &[Publication],
    roster: &Roster,
    protagonist_name: &str,
    meta: Option<&MasterfileMeta>,
) -> Vec<String> {
    if roster.is_empty() && meta.is_none() {
        return Vec::new();
    }

    let mut lines = header(roster, protagonist_name, meta);

    let mut ordered: Vec<&Publication> = publications.iter().collect();
    ordered.sort_by_key(|p| p.year);

    let all = roster.abbreviations().collect::<Vec<_>>().join(",");
    for publication in ordered {
        lines.push(publication_line(publication, roster, &all));
    }

    lines
}

/// Join lines into the artifact text
pub fn render(lines: &[String]) -> String {
    lines.join("\n")
}

/// Download name for a protagonist: "Ann Bee" → "Ann_Bee.master"
pub fn masterfile_filename(name: &str) -> String {
    format!("{}.{}", file_stem(name), MASTERFILE_EXTENSION)
}

/// Whitespace runs become "_", then "&" is dropped. Path separators
/// become "_" so a PID used as a name stays a single file.
pub fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
        } else {
            in_space = false;
            stem.push(c);
        }
    }
    stem.replace('&', "").replace(['/', '\\'], "_")
}

fn header(roster: &Roster, protagonist_name: &str, meta: Option<&MasterfileMeta>) -> Vec<String> {
    let mut lines = vec![
        BANNER.to_string(),
        format!("* Main Author: {}", protagonist_name),
    ];

    if let Some(meta) = meta {
        lines.push(format!("* Generated at: {}", meta.generated_at_display()));
        lines.push(format!("* Filters: {}", meta.filters_json().unwrap_or_default()));
        lines.push(format!(
            "* Papers: {}, Distinct coauthors: {}",
            meta.stats.publication_count, meta.stats.distinct_coauthor_count
        ));
        lines.push(format!(
            "* Avg coauthor strength in set: {:.2}",
            meta.stats.avg_coauthor_strength_in_set
        ));
        lines.push(format!(
            "* Avg coauthor strength global: {:.2}",
            meta.stats.avg_coauthor_strength_global
        ));
        lines.push(format!("* Breakdown: {}", meta.stats.breakdown()));
    }

    for entry in roster.entries() {
        lines.push(format!("{} {}", entry.abbreviation, entry.full_name));
    }

    lines.push(String::new());
    if let Some(protagonist) = roster.protagonist() {
        lines.push(format!("{} Protagonist", protagonist.abbreviation));
    }
    lines.push(String::new());

    lines
}

fn publication_line(publication: &Publication, roster: &Roster, all: &str) -> String {
    let mut present: Vec<&str> = Vec::new();
    for author in &publication.authors {
        if let Some(entry) = roster.get(&author.id) {
            if !present.contains(&entry.abbreviation.as_str()) {
                present.push(&entry.abbreviation);
            }
        }
    }

    let present_set: HashSet<&str> = present.iter().copied().collect();
    let missing: Vec<&str> = roster
        .abbreviations()
        .filter(|a| !present_set.contains(a))
        .collect();

    let mut line = format!("t{} : {}", publication.year, present.join(","));
    if !missing.is_empty() {
        line.push(';');
        line.push_str(&missing.join(";"));
    }
    line.push_str(" : ");
    line.push_str(all);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::build_roster;
    use crate::stats::MasterfileStats;
    use chrono::{TimeZone, Utc};
    use masterforge_common::{Author, FilterSpec};

    fn publication(year: i32, authors: &[(&str, &str)]) -> Publication {
        Publication {
            identifier: format!("pub-{}-{}", year, authors.len()),
            year,
            pub_type: None,
            authors: authors.iter().map(|(id, name)| Author::new(*id, *name)).collect(),
            title: None,
        }
    }

    fn sample() -> Vec<Publication> {
        vec![
            publication(2020, &[("p1", "Ann Bee"), ("c1", "Cy Dee")]),
            publication(2019, &[("p1", "Ann Bee")]),
        ]
    }

    #[test]
    fn test_encode_without_meta() {
        let publications = sample();
        let roster = build_roster(&publications, "p1").unwrap();
        let lines = encode(&publications, &roster, "Ann Bee", None);
        assert_eq!(
            lines,
            vec![
                BANNER,
                "* Main Author: Ann Bee",
                "AB Ann Bee",
                "CD Cy Dee",
                "",
                "AB Protagonist",
                "",
                "t2019 : AB;CD : AB,CD",
                "t2020 : AB,CD : AB,CD",
            ]
        );
    }

    #[test]
    fn test_lines_are_year_ascending_and_stable() {
        let publications = vec![
            publication(2021, &[("p1", "Ann Bee"), ("c2", "Ed Eff")]),
            publication(2019, &[("p1", "Ann Bee"), ("c1", "Cy Dee")]),
            publication(2021, &[("p1", "Ann Bee"), ("c1", "Cy Dee")]),
        ];
        let roster = build_roster(&publications, "p1").unwrap();
        let lines = encode(&publications, &roster, "Ann Bee", None);
        let body: Vec<&String> = lines.iter().filter(|l| l.starts_with('t')).collect();
        assert_eq!(
            body,
            vec![
                "t2019 : AB,CD;EF : AB,CD,EF",
                "t2021 : AB,EF;CD : AB,CD,EF",
                "t2021 : AB,CD;EF : AB,CD,EF",
            ]
        );
    }

    #[test]
    fn test_present_and_missing_partition_roster() {
        let publications = vec![
            publication(2018, &[("c3", "Gil Hay"), ("p1", "Ann Bee"), ("c3", "Gil Hay")]),
            publication(2019, &[("p1", "Ann Bee"), ("c1", "Cy Dee"), ("c2", "Ed Eff")]),
        ];
        let roster = build_roster(&publications, "p1").unwrap();
        let all: HashSet<&str> = roster.abbreviations().collect();

        for line in encode(&publications, &roster, "Ann Bee", None)
            .iter()
            .filter(|l| l.starts_with('t'))
        {
            let codes = line.split(" : ").nth(1).unwrap();
            let (present, missing) = codes.split_once(';').unwrap_or((codes, ""));
            let present: HashSet<&str> = present.split(',').filter(|s| !s.is_empty()).collect();
            let missing: HashSet<&str> = missing.split(';').filter(|s| !s.is_empty()).collect();
            assert!(present.is_disjoint(&missing));
            assert_eq!(present.union(&missing).copied().collect::<HashSet<_>>(), all);
        }
    }

    #[test]
    fn test_authors_outside_roster_are_skipped() {
        let publications = sample();
        let roster = build_roster(&publications, "p1").unwrap();
        let extra = vec![publication(2022, &[("zz", "Zed Zo"), ("p1", "Ann Bee")])];
        let lines = encode(&extra, &roster, "Ann Bee", None);
        assert_eq!(lines.last().unwrap(), "t2022 : AB;CD : AB,CD");
    }

    #[test]
    fn test_header_with_meta() {
        let publications = sample();
        let roster = build_roster(&publications, "p1").unwrap();
        let mut stats = MasterfileStats {
            publication_count: 2,
            distinct_coauthor_count: 1,
            avg_coauthor_strength_in_set: 1.0 / 3.0,
            avg_coauthor_strength_global: 2.5,
            ..Default::default()
        };
        stats.by_type.insert("Article".into(), 2);
        let meta = MasterfileMeta {
            generated_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            protagonist: Author::new("p1", "Ann Bee"),
            filters: FilterSpec::for_protagonist("p1"),
            stats,
            per_paper: Vec::new(),
        };

        let lines = encode(&publications, &roster, "Ann Bee", Some(&meta));
        assert_eq!(&lines[..8], &[
            BANNER.to_string(),
            "* Main Author: Ann Bee".to_string(),
            "* Generated at: 2024-01-02T03:04:05.000Z".to_string(),
            r#"* Filters: {"protagonistId":"p1","types":[]}"#.to_string(),
            "* Papers: 2, Distinct coauthors: 1".to_string(),
            "* Avg coauthor strength in set: 0.33".to_string(),
            "* Avg coauthor strength global: 2.50".to_string(),
            "* Breakdown: 2 Article".to_string(),
        ]);
        assert_eq!(lines[8], "AB Ann Bee");
    }

    #[test]
    fn test_empty_roster() {
        let roster = Roster::default();
        assert!(encode(&[], &roster, "Ann Bee", None).is_empty());

        let meta = MasterfileMeta {
            generated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            protagonist: Author::new("p1", "Ann Bee"),
            filters: FilterSpec::for_protagonist("p1"),
            stats: MasterfileStats::default(),
            per_paper: Vec::new(),
        };
        let lines = encode(&[], &roster, "Ann Bee", Some(&meta));
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[7], "* Breakdown: ");
        assert_eq!(&lines[8..], &["", ""]);
        assert!(!lines.iter().any(|l| l.ends_with("Protagonist")));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let publications = sample();
        let roster = build_roster(&publications, "p1").unwrap();
        assert_eq!(
            encode(&publications, &roster, "Ann Bee", None),
            encode(&publications, &roster, "Ann Bee", None)
        );
    }

    #[test]
    fn test_filename() {
        assert_eq!(masterfile_filename("Ann Bee"), "Ann_Bee.master");
        assert_eq!(masterfile_filename("Ann  \t Bee"), "Ann_Bee.master");
        assert_eq!(masterfile_filename("Ann & Bee"), "Ann__Bee.master");
        assert_eq!(masterfile_filename("R&D"), "RD.master");
        assert_eq!(masterfile_filename("h/AnnBee"), "h_AnnBee.master");
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&["a".into(), "".into(), "b".into()]), "a\n\nb");
    }
}
