//! CLI module
//!
//! Command-line interface for fetching list endpoints across partitions.
//!
//! # Commands
//!
//! - `fetch` - Fetch every page of an endpoint for each partition
//! - `config` - Print the effective configuration
//! - `validate` - Check the configuration and partitions file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{load_partitions, PartitionEntry, Runner, DEFAULT_PARTITION};
