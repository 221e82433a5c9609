//! Subcommand implementations.

pub mod common;
pub mod config;
pub mod estimate;
pub mod sync;
