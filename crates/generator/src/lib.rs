//! MasterForge Generator
//!
//! Turns a protagonist's dblp collaboration rows into a masterfile:
//! - `stats`: overall and per-publication collaboration metrics
//! - `roster`: ordered author list with collision-free abbreviations
//! - `encoder`: presence/absence lines and the metadata header
//! - `meta`: the JSON metadata artifact
//! - `index`: the CSV index of generated masterfiles
//! - `pipeline`: one protagonist, end to end
//! - `batch`: many protagonists, paced and cancellable

pub mod batch;
pub mod encoder;
pub mod index;
pub mod meta;
pub mod pipeline;
pub mod roster;
pub mod stats;

pub use batch::{run_batch, BatchError, BatchOptions, BatchReport};
pub use encoder::{encode, masterfile_filename, render};
pub use index::{IndexRow, IndexWriter};
pub use meta::{MasterfileMeta, PaperDetail};
pub use pipeline::{generate, GenerationOutcome, GenerationRequest};
pub use roster::{build_roster, Roster, RosterEntry, RosterError};
pub use stats::{aggregate, MasterfileStats};
