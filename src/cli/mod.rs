//! CLI layer for compass-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! analyzing queries, searching and listing agents, and routing queries.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
