//! CLI commands and argument parsing

use crate::types::PaginationType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resilient multi-branch paginated fetch
#[derive(Parser, Debug)]
#[command(name = "branch-fetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every page of an endpoint across partitions
    Fetch {
        /// Endpoint URL, used by partitions without their own `base_url`
        #[arg(short, long)]
        url: Option<String>,

        /// Partitions file (YAML or JSON list of {id, base_url, headers, args})
        #[arg(short, long)]
        partitions: Option<PathBuf>,

        /// Endpoint argument sent with every call (repeatable)
        #[arg(short = 'a', long = "arg", value_name = "NAME=VALUE")]
        args: Vec<String>,

        /// Header sent with every call (repeatable)
        #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Dot-separated path to the records inside each response
        #[arg(long)]
        records_path: Option<String>,

        /// Items requested per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Attempts per page before a partition fails
        #[arg(long)]
        max_retries: Option<u32>,

        /// Page addressing: skip_take or page_page_size
        #[arg(long)]
        pagination: Option<PaginationType>,

        /// Fetch a single unpaginated batch per partition
        #[arg(long)]
        no_pagination: bool,

        /// Partitions fetched at once
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Exit with an error if any partition failed
        #[arg(long)]
        strict: bool,
    },

    /// Print the effective configuration as YAML
    Config,

    /// Validate the configuration and partitions file
    Validate {
        /// Partitions file to check
        #[arg(short, long)]
        partitions: Option<PathBuf>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
