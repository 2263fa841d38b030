//! Subcommand implementations

use crate::input::read_protagonists_file;
use crate::FilterArgs;
use chrono::Utc;
use masterforge_common::{
    config::AppConfig,
    dblp::{build_query, AuthorSearch},
    Author, FilterSpec, QueryExecutor, SparqlClient,
};
use masterforge_generator::{
    run_batch, BatchError, BatchOptions, BatchReport, GenerationOutcome, GenerationRequest,
    IndexWriter,
};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{info, warn};

pub fn query(spec: &FilterSpec) -> anyhow::Result<()> {
    println!("{}", build_query(spec));
    Ok(())
}

pub async fn search(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let search = AuthorSearch::from_config(&config.dblp)?;
    let candidates = search.search(name).await?;

    if candidates.is_empty() {
        eprintln!("No authors found for '{}'", name);
    }
    for candidate in candidates {
        println!("{}\t{}", candidate.author.id, candidate.hint);
    }
    Ok(())
}

pub async fn generate(
    config: &AppConfig,
    pid: &str,
    name: &str,
    spec: FilterSpec,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let executor = SparqlClient::from_config(&config.dblp)?;
    let dir = out.unwrap_or_else(|| config.output.directory.clone());
    let request = GenerationRequest::new(Author::new(pid, name), spec);

    let outcome = generate_to(&executor, &request, &dir, config.output.write_metadata).await?;
    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }
    println!("{}", dir.join(&outcome.filename).display());
    Ok(())
}

pub async fn batch(
    config: &AppConfig,
    input: &Path,
    filters: &FilterArgs,
    out: Option<PathBuf>,
    testset: Option<String>,
) -> anyhow::Result<()> {
    let protagonists = read_protagonists_file(input)?;
    info!(count = protagonists.len(), input = %input.display(), "Protagonists loaded");

    let requests = protagonists
        .into_iter()
        .map(|author| {
            let spec = filters.to_spec(&author.id)?;
            Ok(GenerationRequest::new(author, spec))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let executor = SparqlClient::from_config(&config.dblp)?;
    let dir = out.unwrap_or_else(|| config.output.directory.clone());
    let options = BatchOptions::from_config(&config.batch, testset);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            let _ = cancel_tx.send(true);
        }
    });

    let report = batch_to(
        &executor,
        &requests,
        &options,
        cancel_rx,
        &dir,
        config.output.write_metadata,
    )
    .await?;

    for error in &report.errors {
        eprintln!("error: {}: {}", error.protagonist_id, error.message);
    }
    println!(
        "Testset {}: {} generated, {} failed, {} skipped",
        report.testset_id,
        report.items.len(),
        report.errors.len(),
        report.skipped
    );
    Ok(())
}

/// Generate one masterfile and write its artifacts into `dir`
pub async fn generate_to(
    executor: &dyn QueryExecutor,
    request: &GenerationRequest,
    dir: &Path,
    with_metadata: bool,
) -> anyhow::Result<GenerationOutcome> {
    let outcome = masterforge_generator::generate(executor, request, Utc::now()).await?;
    outcome.write_artifacts(dir, with_metadata)?;
    Ok(outcome)
}

/// Run a batch, write every masterfile and append the testset index.
/// An item whose artifacts cannot be written moves to the error list and
/// gets no index row.
pub async fn batch_to(
    executor: &dyn QueryExecutor,
    requests: &[GenerationRequest],
    options: &BatchOptions,
    cancel: watch::Receiver<bool>,
    dir: &Path,
    with_metadata: bool,
) -> anyhow::Result<BatchReport> {
    let mut report = run_batch(executor, requests, options, cancel).await;

    std::fs::create_dir_all(dir)?;
    let items = std::mem::take(&mut report.items);
    let rows = std::mem::take(&mut report.index_rows);
    for (outcome, row) in items.into_iter().zip(rows) {
        match outcome.write_artifacts(dir, with_metadata) {
            Ok(_) => {
                report.items.push(outcome);
                report.index_rows.push(row);
            }
            Err(e) => {
                warn!(pid = %outcome.protagonist.id, error = %e, "Could not write artifacts");
                report.errors.push(BatchError {
                    protagonist_id: outcome.protagonist.id.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    let index = IndexWriter::for_testset(dir, &report.testset_id);
    index.append(&report.index_rows)?;
    info!(index = %index.path().display(), rows = report.index_rows.len(), "Index updated");

    Ok(report)
}
