//! Masterfile generation handlers

use axum::{extract::State, Json};
use chrono::Utc;
use masterforge_common::{
    errors::{AppError, Result},
    Author,
};
use masterforge_generator::{
    index::to_csv_string, run_batch, BatchError, BatchOptions, GenerationRequest, IndexRow,
    MasterfileMeta,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use validator::Validate;

use super::filters::{validated, FilterRequest};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ProtagonistRequest {
    #[validate(length(min = 1, max = 100))]
    pub id: String,

    #[serde(default)]
    #[validate(length(max = 300))]
    pub name: String,
}

/// Single masterfile request
#[derive(Debug, Deserialize, Validate)]
pub struct MasterfileRequest {
    #[validate(nested)]
    pub protagonist: ProtagonistRequest,

    #[serde(default)]
    pub filters: FilterRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterfileResponse {
    pub protagonist: Author,
    pub filename: String,
    pub masterfile: String,
    pub roster_size: usize,
    pub warnings: Vec<String>,
    pub meta: MasterfileMeta,
    pub processing_time_ms: u64,
}

/// Batch request; every item shares `filters` unless it brings its own
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[validate(length(max = 100))]
    pub testset_id: Option<String>,

    #[validate(nested)]
    pub items: Vec<MasterfileItem>,

    #[serde(default)]
    pub filters: FilterRequest,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MasterfileItem {
    #[validate(nested)]
    pub protagonist: ProtagonistRequest,

    #[serde(default)]
    pub filters: Option<FilterRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResponse {
    pub protagonist: Author,
    pub filename: String,
    pub masterfile: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub testset_id: String,
    pub items: Vec<BatchItemResponse>,
    pub errors: Vec<BatchError>,
    pub index_rows: Vec<IndexRow>,
    pub index_csv: String,
    /// Items not generated before the batch deadline
    pub skipped: usize,
    pub processing_time_ms: u64,
}

/// Batch time budget, inside the request timeout so finished items are still returned
fn batch_deadline(request_timeout: Duration) -> Duration {
    request_timeout * 4 / 5
}

impl ProtagonistRequest {
    fn to_author(&self) -> Author {
        Author::new(self.id.trim(), self.name.trim())
    }
}

/// Generate one masterfile
pub async fn generate_masterfile(
    State(state): State<AppState>,
    Json(request): Json<MasterfileRequest>,
) -> Result<Json<MasterfileResponse>> {
    let start = Instant::now();
    validated(&request)?;

    let protagonist = request.protagonist.to_author();
    let filters = request.filters.into_spec(&protagonist.id)?;
    let generation = GenerationRequest::new(protagonist, filters);

    let outcome = masterforge_generator::generate(state.executor.as_ref(), &generation, Utc::now()).await?;

    tracing::info!(
        pid = %outcome.protagonist.id,
        publications = outcome.meta.stats.publication_count,
        roster_size = outcome.roster_size,
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Masterfile request completed"
    );

    Ok(Json(MasterfileResponse {
        masterfile: outcome.masterfile(),
        protagonist: outcome.protagonist,
        filename: outcome.filename,
        roster_size: outcome.roster_size,
        warnings: outcome.warnings,
        meta: outcome.meta,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Generate masterfiles for several protagonists
pub async fn generate_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>> {
    let start = Instant::now();
    validated(&request)?;

    let max_items = state.config.server.max_batch_items;
    if request.items.is_empty() {
        return Err(AppError::Validation {
            message: "Batch must contain at least one item".to_string(),
            field: Some("items".to_string()),
        });
    }
    if request.items.len() > max_items {
        return Err(AppError::Validation {
            message: format!("Batch size {} exceeds maximum of {}", request.items.len(), max_items),
            field: Some("items".to_string()),
        });
    }

    let mut requests = Vec::with_capacity(request.items.len());
    for item in request.items {
        let protagonist = item.protagonist.to_author();
        let filters = item
            .filters
            .unwrap_or_else(|| request.filters.clone())
            .into_spec(&protagonist.id)?;
        requests.push(GenerationRequest::new(protagonist, filters));
    }

    let mut options = BatchOptions::from_config(&state.config.batch, request.testset_id);
    options.deadline = Some(batch_deadline(state.config.request_timeout()));
    // A client disconnect drops this future, which abandons the batch
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let report = run_batch(state.executor.as_ref(), &requests, &options, cancel_rx).await;

    let index_csv = to_csv_string(&report.index_rows)?;

    tracing::info!(
        testset_id = %report.testset_id,
        generated = report.items.len(),
        failed = report.errors.len(),
        skipped = report.skipped,
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Batch request completed"
    );

    Ok(Json(BatchResponse {
        testset_id: report.testset_id,
        items: report
            .items
            .into_iter()
            .map(|outcome| BatchItemResponse {
                masterfile: outcome.masterfile(),
                protagonist: outcome.protagonist,
                filename: outcome.filename,
                warnings: outcome.warnings,
            })
            .collect(),
        errors: report.errors,
        index_rows: report.index_rows,
        index_csv,
        skipped: report.skipped,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::test_support::{body_json, row, state};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use masterforge_common::dblp::{RawRow, StaticExecutor};
    use masterforge_common::errors::Result;
    use masterforge_common::QueryExecutor;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn executor() -> StaticExecutor {
        StaticExecutor::new()
            .with_rows(
                "p/1",
                vec![
                    row("https://dblp.org/rec/b", "2020", "Cy Dee", "https://dblp.org/pid/c/1"),
                    row("https://dblp.org/rec/a", "2019", "", ""),
                ],
            )
            .with_failure("bad/1")
    }

    #[tokio::test]
    async fn test_generate_masterfile() {
        let app = create_router(state(executor()));
        let response = app
            .oneshot(post(
                "/v1/masterfiles",
                serde_json::json!({"protagonist": {"id": "p/1", "name": "Ann Bee"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["filename"], "Ann_Bee.master");
        assert_eq!(body["rosterSize"], 2);
        let masterfile = body["masterfile"].as_str().unwrap();
        assert!(masterfile.ends_with("t2019 : AB;CD : AB,CD\nt2020 : AB,CD : AB,CD"));
        assert_eq!(body["meta"]["stats"]["publicationCount"], 2);
    }

    #[tokio::test]
    async fn test_inverted_years_are_bad_request() {
        let app = create_router(state(executor()));
        let response = app
            .oneshot(post(
                "/v1/masterfiles",
                serde_json::json!({
                    "protagonist": {"id": "p/1", "name": "Ann Bee"},
                    "filters": {"yearMin": 2021, "yearMax": 2020}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["field"], "yearMin");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let app = create_router(state(executor()));
        let response = app
            .oneshot(post(
                "/v1/masterfiles",
                serde_json::json!({"protagonist": {"id": "bad/1", "name": "Bad"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let app = create_router(state(executor()));
        let response = app
            .oneshot(post(
                "/v1/masterfiles/batch",
                serde_json::json!({
                    "testsetId": "ts1",
                    "items": [
                        {"protagonist": {"id": "p/1", "name": "Ann Bee"}},
                        {"protagonist": {"id": "bad/1", "name": "Bad"}}
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["testsetId"], "ts1");
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["errors"][0]["protagonistId"], "bad/1");
        let csv = body["indexCsv"].as_str().unwrap();
        assert!(csv.starts_with("TestsetID,PID,Name"));
        assert!(csv.contains("ts1,p/1,Ann Bee,2,1,"));
    }

    #[tokio::test]
    async fn test_batch_over_limit() {
        let app = create_router(state(executor()));
        let items: Vec<_> = (0..4)
            .map(|i| serde_json::json!({"protagonist": {"id": format!("x/{}", i)}}))
            .collect();
        let response = app
            .oneshot(post("/v1/masterfiles/batch", serde_json::json!({"items": items})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    struct SlowExecutor {
        delay: Duration,
    }

    #[async_trait]
    impl QueryExecutor for SlowExecutor {
        async fn execute(&self, _query: &str) -> Result<Vec<RawRow>> {
            tokio::time::sleep(self.delay).await;
            Ok(Vec::new())
        }

        fn service_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_slow_batch_returns_finished_items() {
        let mut app_state = state(SlowExecutor { delay: Duration::from_millis(700) });
        let mut config = (*app_state.config).clone();
        config.server.request_timeout_secs = 1;
        app_state.config = Arc::new(config);

        let items: Vec<_> = (1..=3)
            .map(|i| serde_json::json!({"protagonist": {"id": format!("x/{}", i), "name": format!("Author {}", i)}}))
            .collect();
        let response = create_router(app_state)
            .oneshot(post("/v1/masterfiles/batch", serde_json::json!({"items": items})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["protagonist"]["id"], "x/1");
        assert_eq!(body["skipped"], 2);
    }

    #[test]
    fn test_batch_deadline_inside_request_timeout() {
        assert_eq!(super::batch_deadline(Duration::from_secs(120)), Duration::from_secs(96));
    }
}
