//! dblp access
//!
//! - `query`: filter set → SPARQL text
//! - `client`: query execution seam and the reqwest-backed SPARQL client
//! - `normalize`: SPARQL JSON bindings → [`CollaborationRow`](crate::models::CollaborationRow)
//! - `search`: author lookup through the dblp search API

mod client;
mod normalize;
mod query;
mod search;

pub use client::{parse_results, QueryExecutor, SparqlClient, StaticExecutor};
pub use normalize::{normalize, split_list, strip_pid_prefix};
pub use query::{build_query, iri_segment};
pub use search::{extract_pid, search_terms, AuthorCandidate, AuthorSearch};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// dblp person IRI prefix
pub const DBLP_PID_PREFIX: &str = "https://dblp.org/pid/";

/// dblp RDF schema namespace
pub const DBLP_SCHEMA_PREFIX: &str = "https://dblp.org/rdf/schema#";

/// dblp venue stream prefix
pub const DBLP_STREAM_PREFIX: &str = "https://dblp.org/streams/";

/// Service label used in logs and metrics
pub const SPARQL_SERVICE: &str = "dblp-sparql";

/// Result variables projected by [`build_query`]
pub mod columns {
    pub const PUB: &str = "pub";
    pub const TITLE: &str = "title";
    pub const YEAR: &str = "year";
    pub const TYPE: &str = "type";
    pub const COAUTHORS: &str = "coauthors";
    pub const COAUTHOR_IDS: &str = "coIds";
    pub const COAUTHOR_COUNT: &str = "coCount";
    pub const AVG_IN_SET: &str = "avgInSet";
    pub const MIN_IN_SET: &str = "minInSet";
    pub const MAX_IN_SET: &str = "maxInSet";
    pub const AVG_GLOBAL: &str = "avgGlobal";
    pub const MIN_GLOBAL: &str = "minGlobal";
    pub const MAX_GLOBAL: &str = "maxGlobal";
}

/// One bound value in a SPARQL JSON result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl Binding {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: "literal".to_string(),
            value: value.into(),
            datatype: None,
        }
    }

    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: "uri".to_string(),
            value: value.into(),
            datatype: None,
        }
    }
}

/// A raw result row: variable name → binding. Unbound variables are absent.
pub type RawRow = HashMap<String, Binding>;

/// SPARQL 1.1 JSON results document
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    pub results: ResultSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub bindings: Vec<RawRow>,
}
