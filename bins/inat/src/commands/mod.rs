//! CLI command implementations

pub mod cache;
pub mod config;
pub mod images;
pub mod observations;
pub mod taxa;
