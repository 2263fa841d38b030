//! Batch generation
//!
//! Runs [`generate`] for many protagonists in input order. Outbound queries
//! are paced by a token bucket and capped at `concurrency` in flight. One
//! failing protagonist never aborts the others. Flipping the cancel channel
//! to `true` stops new queries; finished items are kept. An optional
//! deadline abandons whatever has not finished by then.

use crate::index::IndexRow;
use crate::pipeline::{generate, GenerationOutcome, GenerationRequest};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use masterforge_common::config::BatchConfig;
use masterforge_common::{metrics, QueryExecutor};
use serde::Serialize;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{timeout_at, Instant};
use tracing::{info, instrument, warn};
use uuid::Uuid;

type Pacer = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Batch tuning
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Shared by every index row of this batch
    pub testset_id: String,
    /// Outbound queries per second; 0 disables pacing
    pub requests_per_second: u32,
    /// Queries in flight at once (at least 1)
    pub concurrency: usize,
    /// Timestamp stamped on every masterfile; defaults to batch start
    pub generated_at: Option<DateTime<Utc>>,
    /// Time budget measured from batch start; unfinished items are skipped
    pub deadline: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default(), None)
    }
}

impl BatchOptions {
    /// Options from the `batch` config section; a missing testset id gets a fresh UUID
    pub fn from_config(config: &BatchConfig, testset_id: Option<String>) -> Self {
        Self {
            testset_id: testset_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            requests_per_second: config.requests_per_second,
            concurrency: config.concurrency,
            generated_at: None,
            deadline: None,
        }
    }

    fn pacer(&self) -> Option<Pacer> {
        NonZeroU32::new(self.requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps).allow_burst(NonZeroU32::MIN)))
    }
}

/// A protagonist whose generation failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchError {
    pub protagonist_id: String,
    pub message: String,
}

/// Everything a batch produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub testset_id: String,
    pub items: Vec<GenerationOutcome>,
    pub errors: Vec<BatchError>,
    pub index_rows: Vec<IndexRow>,
    /// Requests never issued or abandoned because of cancellation or the deadline
    pub skipped: usize,
}

impl BatchReport {
    pub fn cancelled(&self) -> bool {
        self.skipped > 0
    }
}

enum ItemResult {
    Done(Box<GenerationOutcome>),
    Failed(BatchError),
    Skipped,
}

/// Generate masterfiles for every request, in input order
#[instrument(skip_all, fields(testset_id = %options.testset_id, items = requests.len()))]
pub async fn run_batch(
    executor: &dyn QueryExecutor,
    requests: &[GenerationRequest],
    options: &BatchOptions,
    cancel: watch::Receiver<bool>,
) -> BatchReport {
    let generated_at = options.generated_at.unwrap_or_else(Utc::now);
    let pacer = options.pacer();
    let concurrency = options.concurrency.max(1);

    info!(
        requests_per_second = options.requests_per_second,
        concurrency,
        "Starting batch"
    );

    let deadline = options.deadline.map(|budget| Instant::now() + budget);

    let results: Vec<ItemResult> = stream::iter(requests.iter().cloned())
        .map(|request| {
            let pacer = pacer.as_ref();
            let cancel = cancel.clone();
            async move {
                let work = async {
                    if *cancel.borrow() {
                        return ItemResult::Skipped;
                    }
                    if let Some(pacer) = pacer {
                        pacer.until_ready().await;
                    }
                    if *cancel.borrow() {
                        return ItemResult::Skipped;
                    }

                    match generate(executor, &request, generated_at).await {
                        Ok(outcome) => ItemResult::Done(Box::new(outcome)),
                        Err(e) => {
                            metrics::record_batch_failure();
                            warn!(pid = %request.protagonist.id, error = %e, "Batch item failed");
                            ItemResult::Failed(BatchError {
                                protagonist_id: request.protagonist.id.clone(),
                                message: e.to_string(),
                            })
                        }
                    }
                };

                match deadline {
                    Some(deadline) if Instant::now() >= deadline => ItemResult::Skipped,
                    Some(deadline) => timeout_at(deadline, work).await.unwrap_or_else(|_| {
                        warn!(pid = %request.protagonist.id, "Batch deadline reached, item abandoned");
                        ItemResult::Skipped
                    }),
                    None => work.await,
                }
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let mut report = BatchReport {
        testset_id: options.testset_id.clone(),
        items: Vec::new(),
        errors: Vec::new(),
        index_rows: Vec::new(),
        skipped: 0,
    };

    let mut filenames = HashSet::new();
    for result in results {
        match result {
            ItemResult::Done(mut outcome) => {
                if !filenames.insert(outcome.filename.clone()) {
                    outcome.disambiguate();
                    warn!(pid = %outcome.protagonist.id, filename = %outcome.filename, "Repeated name, filename made unique");
                    filenames.insert(outcome.filename.clone());
                }
                report.index_rows.push(outcome.index_row(&options.testset_id));
                report.items.push(*outcome);
            }
            ItemResult::Failed(error) => report.errors.push(error),
            ItemResult::Skipped => report.skipped += 1,
        }
    }

    info!(
        generated = report.items.len(),
        failed = report.errors.len(),
        skipped = report.skipped,
        "Batch finished"
    );

    report
}
