//! SPARQL query construction
//!
//! One query per protagonist: the filtered publications grouped by
//! publication, with per-coauthor collaboration strength computed once in
//! two `GROUP BY ?co` sub-selects (in-set and global) and joined onto every
//! publication the coauthor appears on.

use super::{DBLP_PID_PREFIX, DBLP_STREAM_PREFIX};
use crate::models::FilterSpec;

/// Build the SPARQL query text for a set of filters
///
/// Pure: identical input yields identical text.
pub fn build_query(spec: &FilterSpec) -> String {
    let protagonist = format!("<{}{}>", DBLP_PID_PREFIX, iri_segment(&spec.protagonist_id));
    let types = spec
        .effective_types()
        .iter()
        .map(|t| format!("dblp:{}", t.as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    let venue = spec.venue().map(iri_segment);

    let restrictions = restriction_lines(spec, venue.as_deref(), "pub", "year", "  ");
    let in_set = in_set_block(spec, &protagonist, &types, venue.as_deref());
    let global = global_block(&protagonist);

    format!(
        r#"PREFIX dblp: <https://dblp.org/rdf/schema#>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>

SELECT ?pub ?title ?year ?type
       (GROUP_CONCAT(?coName; separator="|") AS ?coauthors)
       (GROUP_CONCAT(STR(?co); separator="|") AS ?coIds)
       (COUNT(DISTINCT ?co) AS ?coCount)
       (AVG(?inSet) AS ?avgInSet) (MIN(?inSet) AS ?minInSet) (MAX(?inSet) AS ?maxInSet)
       (AVG(?global) AS ?avgGlobal) (MIN(?global) AS ?minGlobal) (MAX(?global) AS ?maxGlobal)
WHERE {{
  ?pub a ?type ;
       dblp:hasSignature ?sigP ;
       dblp:yearOfPublication ?year .
  ?sigP dblp:signatureCreator {protagonist} .
  VALUES ?type {{ {types} }}
{restrictions}  OPTIONAL {{ ?pub dblp:title ?title }}

  OPTIONAL {{
    ?pub dblp:hasSignature ?sigA .
    ?sigA dblp:signatureCreator ?co .
    FILTER(?co != {protagonist})
    ?co dblp:primaryCreatorName ?coName .

{in_set}
{global}
  }}
}}
GROUP BY ?pub ?title ?year ?type
ORDER BY DESC(?year) ?pub
"#
    )
}

/// In-set strength per coauthor, with the optional threshold and top-K focus.
/// Top-K ties break on the coauthor IRI.
fn in_set_block(spec: &FilterSpec, protagonist: &str, types: &str, venue: Option<&str>) -> String {
    let restrictions = restriction_lines(spec, venue, "joint", "jointYear", "        ");

    let mut tail = String::new();
    let min_pubs = spec.min_coauthor_publications();
    if min_pubs > 0 {
        tail.push_str(&format!(
            "      HAVING (COUNT(DISTINCT ?joint) >= {})\n",
            min_pubs
        ));
    }
    let top_k = spec.top_k();
    if top_k > 0 {
        tail.push_str(&format!(
            "      ORDER BY DESC(?inSet) STR(?co)\n      LIMIT {}\n",
            top_k
        ));
    }

    format!(
        r#"    {{
      SELECT ?co (COUNT(DISTINCT ?joint) AS ?inSet) WHERE {{
        ?joint a ?jointType ;
               dblp:hasSignature ?jsP, ?jsA ;
               dblp:yearOfPublication ?jointYear .
        VALUES ?jointType {{ {types} }}
{restrictions}        ?jsP dblp:signatureCreator {protagonist} .
        ?jsA dblp:signatureCreator ?co .
        FILTER(?co != {protagonist})
      }}
      GROUP BY ?co
{tail}    }}"#
    )
}

/// Global strength per coauthor: every joint publication, unrestricted
fn global_block(protagonist: &str) -> String {
    format!(
        r#"    {{
      SELECT ?co (COUNT(DISTINCT ?anyJoint) AS ?global) WHERE {{
        ?anyJoint dblp:hasSignature ?gsP, ?gsA .
        ?gsP dblp:signatureCreator {protagonist} .
        ?gsA dblp:signatureCreator ?co .
        FILTER(?co != {protagonist})
      }}
      GROUP BY ?co
    }}"#
    )
}

/// Venue and year predicates; only the ones that are set are emitted
fn restriction_lines(
    spec: &FilterSpec,
    venue: Option<&str>,
    pub_var: &str,
    year_var: &str,
    indent: &str,
) -> String {
    let mut out = String::new();
    if let Some(venue) = venue {
        out.push_str(&format!(
            "{indent}?{pub_var} dblp:publishedInStream <{DBLP_STREAM_PREFIX}{venue}> .\n"
        ));
    }
    if let Some(min) = spec.year_min {
        out.push_str(&format!(
            "{indent}FILTER(?{year_var} >= \"{min}\"^^xsd:gYear)\n"
        ));
    }
    if let Some(max) = spec.year_max {
        out.push_str(&format!(
            "{indent}FILTER(?{year_var} <= \"{max}\"^^xsd:gYear)\n"
        ));
    }
    out
}

/// Restrict an identifier fragment to characters that are safe inside `<...>`
pub fn iri_segment(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '.' | ':' | '~' | '-'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PublicationType;

    fn spec() -> FilterSpec {
        FilterSpec::for_protagonist("12/3456")
    }

    #[test]
    fn test_default_types_and_protagonist() {
        let query = build_query(&spec());
        assert!(query.contains("VALUES ?type { dblp:Article dblp:Inproceedings }"));
        assert!(query.contains("VALUES ?jointType { dblp:Article dblp:Inproceedings }"));
        assert!(query.contains("?sigP dblp:signatureCreator <https://dblp.org/pid/12/3456> ."));
    }

    #[test]
    fn test_explicit_types() {
        let mut s = spec();
        s.types.insert(PublicationType::Book);
        s.types.insert(PublicationType::Informal);
        let query = build_query(&s);
        assert!(query.contains("VALUES ?type { dblp:Informal dblp:Book }"));
        assert!(!query.contains("dblp:Article"));
    }

    #[test]
    fn test_is_pure() {
        let mut s = spec();
        s.venue_suffix = Some("conf/icse".into());
        s.year_min = Some(2010);
        s.focus_top_k_coauthors = Some(3);
        assert_eq!(build_query(&s), build_query(&s.clone()));
    }

    #[test]
    fn test_venue_clause_only_when_present() {
        let query = build_query(&spec());
        assert!(!query.contains("publishedInStream"));

        let mut s = spec();
        s.venue_suffix = Some("conf/icse".into());
        let query = build_query(&s);
        assert!(query.contains("?pub dblp:publishedInStream <https://dblp.org/streams/conf/icse> ."));
        assert!(query.contains("?joint dblp:publishedInStream <https://dblp.org/streams/conf/icse> ."));
        // the global block stays unrestricted
        assert_eq!(query.matches("publishedInStream").count(), 2);
    }

    #[test]
    fn test_year_bounds_are_independent() {
        let mut s = spec();
        s.year_min = Some(2015);
        let query = build_query(&s);
        assert!(query.contains(r#"FILTER(?year >= "2015"^^xsd:gYear)"#));
        assert!(query.contains(r#"FILTER(?jointYear >= "2015"^^xsd:gYear)"#));
        assert!(!query.contains("<= \""));

        let mut s = spec();
        s.year_max = Some(2020);
        let query = build_query(&s);
        assert!(query.contains(r#"FILTER(?year <= "2020"^^xsd:gYear)"#));
        assert!(!query.contains(">= \""));
    }

    #[test]
    fn test_threshold_and_focus() {
        let query = build_query(&spec());
        assert!(!query.contains("HAVING"));
        assert!(!query.contains("LIMIT"));

        let mut s = spec();
        s.min_coauthor_publications_in_set = Some(2);
        s.focus_top_k_coauthors = Some(5);
        let query = build_query(&s);
        assert!(query.contains("HAVING (COUNT(DISTINCT ?joint) >= 2)"));
        assert!(query.contains("ORDER BY DESC(?inSet) STR(?co)"));
        assert!(query.contains("LIMIT 5"));
    }

    #[test]
    fn test_zero_counts_emit_nothing() {
        let mut s = spec();
        s.min_coauthor_publications_in_set = Some(0);
        s.focus_top_k_coauthors = Some(0);
        assert_eq!(build_query(&s), build_query(&spec()));
    }

    #[test]
    fn test_result_is_grouped_and_ordered() {
        let query = build_query(&spec());
        assert!(query.contains("GROUP BY ?pub ?title ?year ?type"));
        assert!(query.contains("ORDER BY DESC(?year) ?pub"));
        for column in ["?avgInSet", "?minInSet", "?maxInSet", "?avgGlobal", "?minGlobal", "?maxGlobal"] {
            assert!(query.contains(column), "missing {}", column);
        }
    }

    #[test]
    fn test_iri_segment_strips_unsafe_characters() {
        assert_eq!(iri_segment("12/3456-1"), "12/3456-1");
        assert_eq!(iri_segment(" h/Jo hn> } "), "h/John");

        let mut s = FilterSpec::for_protagonist("x> . ?s ?p ?o");
        s.venue_suffix = Some("conf/icse>".into());
        let query = build_query(&s);
        assert!(query.contains("<https://dblp.org/pid/x.spo>"));
        assert!(query.contains("<https://dblp.org/streams/conf/icse>"));
    }
}
