//! Query execution
//!
//! The generator only sees the [`QueryExecutor`] trait: one query in, raw
//! rows out. [`SparqlClient`] talks to the public dblp endpoint;
//! [`StaticExecutor`] serves canned rows for tests and offline runs.

use super::{RawRow, SparqlResults, DBLP_PID_PREFIX, SPARQL_SERVICE};
use crate::config::DblpConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Trait for executing a SPARQL query
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute the query and return its result rows.
    ///
    /// Transport failures are errors; an unreadable body is an empty result.
    async fn execute(&self, query: &str) -> Result<Vec<RawRow>>;

    /// Service name for logs and metrics
    fn service_name(&self) -> &str;
}

/// dblp SPARQL endpoint client
pub struct SparqlClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SparqlClient {
    /// Create a new client with the given transport timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client from the `dblp` configuration section
    pub fn from_config(config: &DblpConfig) -> Result<Self> {
        Self::new(
            config.sparql_endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query), ("format", "json")])
            .header(ACCEPT, "application/sparql-results+json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: SPARQL_SERVICE.to_string(),
                message: format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>()),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl QueryExecutor for SparqlClient {
    #[instrument(skip(self, query), fields(endpoint = %self.endpoint, query_len = query.len()))]
    async fn execute(&self, query: &str) -> Result<Vec<RawRow>> {
        let start = Instant::now();
        let result = self.fetch(query).await;
        metrics::record_query(start.elapsed().as_secs_f64(), SPARQL_SERVICE, result.is_ok());

        let body = result?;
        let rows = parse_results(&body);
        debug!(
            rows = rows.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "SPARQL query completed"
        );
        Ok(rows)
    }

    fn service_name(&self) -> &str {
        SPARQL_SERVICE
    }
}

/// Parse a SPARQL JSON results body. Malformed bodies yield no rows.
pub fn parse_results(body: &str) -> Vec<RawRow> {
    match serde_json::from_str::<SparqlResults>(body) {
        Ok(results) => results.results.bindings,
        Err(e) => {
            warn!(
                error = %e,
                body_prefix = %body.chars().take(100).collect::<String>(),
                "Malformed SPARQL response, treating as empty"
            );
            Vec::new()
        }
    }
}

/// In-memory executor keyed by protagonist PID
///
/// A query is matched to a protagonist by the person IRI it contains.
/// Unmatched queries get no rows.
#[derive(Default)]
pub struct StaticExecutor {
    rows: HashMap<String, Vec<RawRow>>,
    failures: HashSet<String>,
    executed: Mutex<Vec<String>>,
}

impl StaticExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `rows` for queries about `pid`
    pub fn with_rows(mut self, pid: &str, rows: Vec<RawRow>) -> Self {
        self.rows.insert(pid.to_string(), rows);
        self
    }

    /// Fail queries about `pid` with an upstream error
    pub fn with_failure(mut self, pid: &str) -> Self {
        self.failures.insert(pid.to_string());
        self
    }

    /// Queries executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    fn mentions(query: &str, pid: &str) -> bool {
        query.contains(&format!("<{}{}>", DBLP_PID_PREFIX, pid))
    }
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    async fn execute(&self, query: &str) -> Result<Vec<RawRow>> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(query.to_string());
        }

        if let Some(pid) = self.failures.iter().find(|pid| Self::mentions(query, pid)) {
            return Err(AppError::Upstream {
                service: "static".to_string(),
                message: format!("configured failure for {}", pid),
            });
        }

        Ok(self
            .rows
            .iter()
            .find(|(pid, _)| Self::mentions(query, pid))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn service_name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dblp::{build_query, Binding};
    use crate::models::FilterSpec;

    #[test]
    fn test_parse_results() {
        let body = r#"{
            "head": {"vars": ["pub", "year"]},
            "results": {"bindings": [
                {"pub": {"type": "uri", "value": "https://dblp.org/rec/a"},
                 "year": {"type": "literal", "value": "2020", "datatype": "http://www.w3.org/2001/XMLSchema#gYear"}}
            ]}
        }"#;
        let rows = parse_results(body);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["year"].value, "2020");
        assert_eq!(rows[0]["pub"].kind, "uri");
    }

    #[test]
    fn test_malformed_body_is_empty() {
        assert!(parse_results("<html>busy</html>").is_empty());
        assert!(parse_results(r#"{"results": {}}"#).is_empty());
    }

    #[tokio::test]
    async fn test_static_executor_routes_by_pid() {
        let row: RawRow = [("pub".to_string(), Binding::uri("https://dblp.org/rec/a"))]
            .into_iter()
            .collect();
        let executor = StaticExecutor::new()
            .with_rows("12/3456", vec![row])
            .with_failure("99/1");

        let rows = executor
            .execute(&build_query(&FilterSpec::for_protagonist("12/3456")))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let other = executor
            .execute(&build_query(&FilterSpec::for_protagonist("12/345")))
            .await
            .unwrap();
        assert!(other.is_empty());

        let failed = executor
            .execute(&build_query(&FilterSpec::for_protagonist("99/1")))
            .await;
        assert!(failed.is_err());
        assert_eq!(executor.executed().len(), 3);
    }

    #[test]
    fn test_client_from_default_config() {
        let client = SparqlClient::from_config(&DblpConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "https://sparql.dblp.org/sparql");
        assert_eq!(client.service_name(), SPARQL_SERVICE);
    }
}
