//! Domain models
//!
//! Authors, publications, filters and the typed rows the
//! dblp normalizer produces.

mod filter;
mod publication;
mod row;

pub use filter::FilterSpec;
pub use publication::{Author, Publication, PublicationType};
pub use row::CollaborationRow;
