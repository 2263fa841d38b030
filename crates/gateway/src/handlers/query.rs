//! Query preview handler

use axum::Json;
use masterforge_common::{
    dblp,
    errors::{AppError, Result},
};
use serde::Serialize;

use super::filters::FilterRequest;

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
}

/// Build the SPARQL text for a filter without executing it
pub async fn build_query(Json(request): Json<FilterRequest>) -> Result<Json<QueryResponse>> {
    let pid = request
        .protagonist_id
        .clone()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::MissingField {
            field: "protagonistId".to_string(),
        })?;

    let spec = request.into_spec(pid.trim())?;
    Ok(Json(QueryResponse {
        query: dblp::build_query(&spec),
    }))
}
