//! Result normalization
//!
//! Converts SPARQL JSON bindings into [`CollaborationRow`]s. Partial rows are
//! kept with defaulted fields; only a missing publication identifier is fatal.

use super::{columns, RawRow, DBLP_PID_PREFIX, DBLP_SCHEMA_PREFIX};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::models::CollaborationRow;
use std::str::FromStr;
use tracing::{debug, warn};

/// Normalize raw result rows
///
/// Returns `UpstreamContract` when a row has no publication identifier.
pub fn normalize(raw_rows: &[RawRow]) -> Result<Vec<CollaborationRow>> {
    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut defaulted = 0usize;

    for (index, raw) in raw_rows.iter().enumerate() {
        rows.push(normalize_row(index, raw, &mut defaulted)?);
    }

    metrics::record_normalized(rows.len(), defaulted);
    debug!(rows = rows.len(), defaulted, "Rows normalized");

    Ok(rows)
}

fn normalize_row(index: usize, raw: &RawRow, defaulted: &mut usize) -> Result<CollaborationRow> {
    let identifier = value(raw, columns::PUB)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::UpstreamContract {
            message: format!("row {} has no publication identifier", index),
        })?
        .to_string();

    let title = text_or_default(raw, columns::TITLE, &identifier, defaulted);
    let pub_type = text_or_default(raw, columns::TYPE, &identifier, defaulted);
    let pub_type = pub_type
        .strip_prefix(DBLP_SCHEMA_PREFIX)
        .map(str::to_string)
        .unwrap_or(pub_type);

    let names = split_list(value(raw, columns::COAUTHORS).unwrap_or_default());
    let ids: Vec<String> = split_list(value(raw, columns::COAUTHOR_IDS).unwrap_or_default())
        .iter()
        .map(|id| strip_pid_prefix(id))
        .collect();

    if names.len() != ids.len() {
        warn!(
            publication = %identifier,
            names = names.len(),
            ids = ids.len(),
            "Coauthor name and id lists differ in length"
        );
    }

    // Names drive the pairing; a missing id falls back to the name
    let coauthor_ids: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| ids.get(i).cloned().unwrap_or_else(|| name.clone()))
        .collect();

    Ok(CollaborationRow {
        year: number(raw, columns::YEAR, &identifier, defaulted),
        coauthor_count: number(raw, columns::COAUTHOR_COUNT, &identifier, defaulted),
        avg_strength_in_set: number(raw, columns::AVG_IN_SET, &identifier, defaulted),
        min_strength_in_set: number(raw, columns::MIN_IN_SET, &identifier, defaulted),
        max_strength_in_set: number(raw, columns::MAX_IN_SET, &identifier, defaulted),
        avg_strength_global: number(raw, columns::AVG_GLOBAL, &identifier, defaulted),
        min_strength_global: number(raw, columns::MIN_GLOBAL, &identifier, defaulted),
        max_strength_global: number(raw, columns::MAX_GLOBAL, &identifier, defaulted),
        identifier,
        title,
        pub_type,
        coauthor_names: names,
        coauthor_ids,
    })
}

fn value<'a>(raw: &'a RawRow, column: &str) -> Option<&'a str> {
    raw.get(column).map(|b| b.value.as_str())
}

fn text_or_default(raw: &RawRow, column: &str, identifier: &str, defaulted: &mut usize) -> String {
    match value(raw, column) {
        Some(v) => v.to_string(),
        None => {
            *defaulted += 1;
            warn!(publication = %identifier, field = column, "Missing field, defaulting to empty");
            String::new()
        }
    }
}

/// Parse a numeric field, defaulting to zero. Unbound aggregates (MIN/MAX
/// over a publication without coauthors) are expected and only logged at
/// debug level.
fn number<T>(raw: &RawRow, column: &str, identifier: &str, defaulted: &mut usize) -> T
where
    T: FromStr + Default,
{
    match value(raw, column) {
        None => {
            *defaulted += 1;
            debug!(publication = %identifier, field = column, "Unbound numeric field, defaulting to 0");
            T::default()
        }
        Some(v) => parse_number(v).unwrap_or_else(|| {
            *defaulted += 1;
            warn!(publication = %identifier, field = column, value = v, "Unparsable number, defaulting to 0");
            T::default()
        }),
    }
}

/// Integer fields may arrive as decimals ("3.0") or with surrounding space
fn parse_number<T: FromStr>(v: &str) -> Option<T> {
    let v = v.trim();
    v.parse::<T>().ok().or_else(|| {
        let float = v.parse::<f64>().ok().filter(|f| f.is_finite() && f.fract() == 0.0)?;
        format!("{}", float as i64).parse::<T>().ok()
    })
}

/// Split a pipe-joined aggregate; the empty string is the empty list
pub fn split_list(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined.split('|').map(str::to_string).collect()
}

/// "https://dblp.org/pid/12/3456" → "12/3456"
pub fn strip_pid_prefix(iri: &str) -> String {
    iri.strip_prefix(DBLP_PID_PREFIX).unwrap_or(iri).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dblp::Binding;

    fn raw(fields: &[(&str, &str)]) -> RawRow {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), Binding::literal(*v)))
            .collect()
    }

    fn full_row() -> RawRow {
        raw(&[
            ("pub", "https://dblp.org/rec/conf/icse/Bee20"),
            ("title", "Mining Things"),
            ("year", "2020"),
            ("type", "https://dblp.org/rdf/schema#Inproceedings"),
            ("coauthors", "Cy Dee|Ed Eff"),
            ("coIds", "https://dblp.org/pid/11/1|https://dblp.org/pid/22/2"),
            ("coCount", "2"),
            ("avgInSet", "2.5"),
            ("minInSet", "1"),
            ("maxInSet", "4"),
            ("avgGlobal", "6"),
            ("minGlobal", "2"),
            ("maxGlobal", "10"),
        ])
    }

    #[test]
    fn test_full_row() {
        let rows = normalize(&[full_row()]).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.identifier, "https://dblp.org/rec/conf/icse/Bee20");
        assert_eq!(row.year, 2020);
        assert_eq!(row.pub_type, "Inproceedings");
        assert_eq!(row.coauthor_names, vec!["Cy Dee", "Ed Eff"]);
        assert_eq!(row.coauthor_ids, vec!["11/1", "22/2"]);
        assert_eq!(row.coauthor_count, 2);
        assert_eq!(row.avg_strength_in_set, 2.5);
        assert_eq!(row.max_strength_global, 10.0);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let rows = normalize(&[raw(&[("pub", "https://dblp.org/rec/x"), ("year", "2001")])]).unwrap();
        let row = &rows[0];
        assert_eq!(row.title, "");
        assert_eq!(row.pub_type, "");
        assert!(row.coauthor_names.is_empty());
        assert!(row.coauthor_ids.is_empty());
        assert_eq!(row.coauthor_count, 0);
        assert_eq!(row.min_strength_in_set, 0.0);
    }

    #[test]
    fn test_unparsable_numbers_default_to_zero() {
        let mut r = full_row();
        r.insert("year".into(), Binding::literal("n/a"));
        r.insert("avgGlobal".into(), Binding::literal("lots"));
        r.insert("coCount".into(), Binding::literal("3.0"));
        let row = &normalize(&[r]).unwrap()[0];
        assert_eq!(row.year, 0);
        assert_eq!(row.avg_strength_global, 0.0);
        assert_eq!(row.coauthor_count, 3);
    }

    #[test]
    fn test_lists_stay_parallel() {
        let mut r = full_row();
        r.insert("coIds".into(), Binding::literal("https://dblp.org/pid/11/1"));
        let row = &normalize(&[r]).unwrap()[0];
        assert_eq!(row.coauthor_names.len(), row.coauthor_ids.len());
        assert_eq!(row.coauthor_ids, vec!["11/1", "Ed Eff"]);
    }

    #[test]
    fn test_missing_identifier_is_contract_violation() {
        let result = normalize(&[full_row(), raw(&[("year", "2001")])]);
        match result {
            Err(AppError::UpstreamContract { message }) => assert!(message.contains("row 1")),
            other => panic!("expected contract violation, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize(&[]).unwrap().is_empty());
        assert!(split_list("").is_empty());
        assert_eq!(split_list("a|b"), vec!["a", "b"]);
    }
}
