//! CLI command implementations.

pub mod analyze;
pub mod bands;
pub mod config;
