//! Authors and publications

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An author as identified by dblp
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    /// Stable identifier (dblp PID, e.g. "12/3456")
    pub id: String,

    /// Display name; may repeat across authors
    #[serde(default)]
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// dblp publication classes, in schema declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PublicationType {
    Article,
    Inproceedings,
    Incollection,
    Informal,
    Book,
    Data,
    Editorship,
    Reference,
    Withdrawn,
}

impl PublicationType {
    pub const ALL: [PublicationType; 9] = [
        PublicationType::Article,
        PublicationType::Inproceedings,
        PublicationType::Incollection,
        PublicationType::Informal,
        PublicationType::Book,
        PublicationType::Data,
        PublicationType::Editorship,
        PublicationType::Reference,
        PublicationType::Withdrawn,
    ];

    /// Types queried when a filter names none
    pub const DEFAULT: [PublicationType; 2] =
        [PublicationType::Article, PublicationType::Inproceedings];

    /// Local name within the dblp schema namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationType::Article => "Article",
            PublicationType::Inproceedings => "Inproceedings",
            PublicationType::Incollection => "Incollection",
            PublicationType::Informal => "Informal",
            PublicationType::Book => "Book",
            PublicationType::Data => "Data",
            PublicationType::Editorship => "Editorship",
            PublicationType::Reference => "Reference",
            PublicationType::Withdrawn => "Withdrawn",
        }
    }
}

impl fmt::Display for PublicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PublicationType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown publication type: {}", s))
    }
}

/// A publication with its ordered author list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    /// Publication IRI or key
    pub identifier: String,

    pub year: i32,

    /// None when the source omitted the type or used an unknown one
    #[serde(rename = "type")]
    pub pub_type: Option<PublicationType>,

    /// Authors, unique by id
    pub authors: Vec<Author>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}
