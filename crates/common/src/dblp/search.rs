//! Author lookup via the dblp search API

use crate::config::DblpConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::models::Author;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

const SEARCH_SERVICE: &str = "dblp-search";

/// A search hit offered to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorCandidate {
    pub author: Author,
    /// Name plus the first dblp note, e.g. "Ann Bee (TU Somewhere)"
    pub hint: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Option<Hits>,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    hit: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    info: HitInfo,
}

#[derive(Debug, Deserialize)]
struct HitInfo {
    author: String,
    url: String,
    #[serde(default)]
    notes: Option<Notes>,
}

#[derive(Debug, Deserialize)]
struct Notes {
    note: OneOrMany<Note>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

#[derive(Debug, Deserialize)]
struct Note {
    #[serde(default)]
    text: String,
}

/// dblp author search client
pub struct AuthorSearch {
    client: reqwest::Client,
    endpoint: String,
    max_hits: u32,
}

impl AuthorSearch {
    pub fn new(endpoint: impl Into<String>, max_hits: u32, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_hits,
        })
    }

    pub fn from_config(config: &DblpConfig) -> Result<Self> {
        Self::new(
            config.search_endpoint.clone(),
            config.search_max_hits,
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    /// Find authors whose name matches
    #[instrument(skip(self))]
    pub async fn search(&self, name: &str) -> Result<Vec<AuthorCandidate>> {
        let terms = search_terms(name);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.max_hits.to_string();
        let start = Instant::now();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", terms.as_str()),
                ("format", "json"),
                ("h", hits.as_str()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                metrics::record_query(start.elapsed().as_secs_f64(), SEARCH_SERVICE, false);
                return Err(AppError::Upstream {
                    service: SEARCH_SERVICE.to_string(),
                    message: format!("HTTP {}", r.status()),
                });
            }
            Err(e) => {
                metrics::record_query(start.elapsed().as_secs_f64(), SEARCH_SERVICE, false);
                return Err(e.into());
            }
        };

        let body = response.text().await?;
        metrics::record_query(start.elapsed().as_secs_f64(), SEARCH_SERVICE, true);

        let candidates = parse_hits(&body)?;
        info!(query = %terms, hits = candidates.len(), "Author search completed");
        Ok(candidates)
    }
}

/// Collapse whitespace and drop '&', which the search API treats as a separator
pub fn search_terms(name: &str) -> String {
    name.replace('&', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the PID from a dblp person URL ("https://dblp.org/pid/12/3456" → "12/3456")
pub fn extract_pid(url: &str) -> Option<String> {
    static PID: OnceLock<Regex> = OnceLock::new();
    let re = PID.get_or_init(|| Regex::new(r"\w+/[A-Za-z0-9_-]+$").expect("valid PID pattern"));
    re.find(url.trim()).map(|m| m.as_str().to_string())
}

fn parse_hits(body: &str) -> Result<Vec<AuthorCandidate>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let hits = response.result.hits.map(|h| h.hit).unwrap_or_default();

    Ok(hits
        .into_iter()
        .map(|hit| {
            let info = hit.info;
            let note = info.notes.and_then(|n| match n.note {
                OneOrMany::One(note) => Some(note.text),
                OneOrMany::Many(notes) => notes.into_iter().next().map(|n| n.text),
            });
            let hint = match note.filter(|n| !n.is_empty()) {
                Some(note) => format!("{} ({})", info.author, note),
                None => info.author.clone(),
            };
            AuthorCandidate {
                author: Author::new(extract_pid(&info.url).unwrap_or_default(), info.author),
                hint,
            }
        })
        .collect())
}
