//! API handlers module

pub mod authors;
pub mod filters;
pub mod health;
pub mod masterfiles;
pub mod query;
