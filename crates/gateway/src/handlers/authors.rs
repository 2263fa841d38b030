//! Author search handler

use axum::{
    extract::{Query, State},
    Json,
};
use masterforge_common::{dblp::AuthorCandidate, errors::Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use super::filters::validated;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AuthorQuery {
    #[validate(length(min = 1, max = 200))]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorsResponse {
    pub query: String,
    pub total: usize,
    pub candidates: Vec<AuthorCandidate>,
    pub processing_time_ms: u64,
}

/// Look up dblp authors by name
pub async fn search_authors(
    State(state): State<AppState>,
    Query(query): Query<AuthorQuery>,
) -> Result<Json<AuthorsResponse>> {
    let start = Instant::now();
    validated(&query)?;

    let candidates = state.search.search(&query.q).await?;

    tracing::info!(
        query = %query.q,
        results = candidates.len(),
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Author search completed"
    );

    Ok(Json(AuthorsResponse {
        query: query.q,
        total: candidates.len(),
        candidates,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
