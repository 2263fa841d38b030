//! MasterForge command line
//!
//! `masterforge query | search | generate | batch`

mod commands;
mod input;

use clap::{Args, Parser, Subcommand};
use masterforge_common::{config::AppConfig, FilterSpec, PublicationType};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "masterforge", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (otherwise config/ and APP__ variables)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<String>,

    /// Log filter, e.g. "info" or "masterforge_generator=debug"
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SPARQL query for a protagonist and filters
    Query {
        #[arg(long)]
        pid: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Search dblp authors by name
    Search {
        name: String,
    },
    /// Generate one masterfile
    Generate {
        #[arg(long)]
        pid: String,
        #[arg(long)]
        name: String,
        #[command(flatten)]
        filters: FilterArgs,
        /// Output directory (defaults to output.directory)
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },
    /// Generate masterfiles for every `pid,name` row of a CSV file
    Batch {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
        /// Testset id for the index (random when omitted)
        #[arg(short = 't', long = "testset")]
        testset: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Publication types, comma separated (default: Article,Inproceedings)
    #[arg(long = "types", value_delimiter = ',')]
    pub types: Vec<PublicationType>,

    /// Venue stream suffix, e.g. conf/icse
    #[arg(long = "venue")]
    pub venue: Option<String>,

    /// Minimum joint publications in the set for a coauthor
    #[arg(long = "min-coauthor-pubs", allow_negative_numbers = true)]
    pub min_coauthor_pubs: Option<i64>,

    /// Keep only the K strongest coauthors
    #[arg(long = "top-k", allow_negative_numbers = true)]
    pub top_k: Option<i64>,

    #[arg(long = "year-min")]
    pub year_min: Option<i32>,

    #[arg(long = "year-max")]
    pub year_max: Option<i32>,
}

impl FilterArgs {
    /// Filters for `pid`, with negative counts clamped to zero
    pub fn to_spec(&self, pid: &str) -> anyhow::Result<FilterSpec> {
        if let (Some(min), Some(max)) = (self.year_min, self.year_max) {
            anyhow::ensure!(min <= max, "--year-min ({}) must not exceed --year-max ({})", min, max);
        }

        Ok(FilterSpec {
            protagonist_id: pid.to_string(),
            types: self.types.iter().copied().collect(),
            venue_suffix: self.venue.clone(),
            min_coauthor_publications_in_set: FilterSpec::clamp_count(self.min_coauthor_pubs),
            focus_top_k_coauthors: FilterSpec::clamp_count(self.top_k),
            year_min: self.year_min,
            year_max: self.year_max,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    init_tracing(level, config.observability.json_logging);

    match cli.command {
        Command::Query { pid, filters } => commands::query(&filters.to_spec(&pid)?),
        Command::Search { name } => commands::search(&config, &name).await,
        Command::Generate { pid, name, filters, out } => {
            let spec = filters.to_spec(&pid)?;
            commands::generate(&config, &pid, &name, spec, out).await
        }
        Command::Batch { input, filters, out, testset } => {
            commands::batch(&config, &input, &filters, out, testset).await
        }
    }
}

/// Logs go to stderr so stdout stays clean for query text and results
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
