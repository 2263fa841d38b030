//! MasterForge Common Library
//!
//! Shared code for the MasterForge generator, gateway and CLI including:
//! - Domain models (authors, publications, filters, collaboration rows)
//! - dblp access: query builder, result normalizer, SPARQL executor, author search
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod dblp;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use dblp::{QueryExecutor, SparqlClient};
pub use errors::{AppError, Result};
pub use models::{Author, CollaborationRow, FilterSpec, Publication, PublicationType};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default public dblp SPARQL endpoint
pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://sparql.dblp.org/sparql";

/// Default dblp author search endpoint
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://dblp.org/search/author/api";
