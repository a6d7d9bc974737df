//! CLI commands

use crate::core::temporal::Timestamp;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Blob change feed reader
#[derive(Parser)]
#[command(name = "changefeed")]
#[command(about = "Read a time-partitioned blob change feed")]
pub struct Cli {
    /// Emit logs as JSON instead of plain text
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print change events as JSON lines
    Read {
        /// Account directory holding the change feed container
        #[arg(short, long)]
        root: PathBuf,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Earliest time to read (RFC 3339), floored to the hour
        #[arg(long, conflicts_with = "cursor")]
        start: Option<Timestamp>,
        /// Latest time to read (RFC 3339), ceiled to the next hour
        #[arg(long, conflicts_with = "cursor")]
        end: Option<Timestamp>,
        /// Continuation token printed by a previous run
        #[arg(long)]
        cursor: Option<String>,
        /// Events per page (overrides the configuration)
        #[arg(long)]
        page_size: Option<usize>,
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Print the current last-consumable bound
    Bound {
        /// Account directory holding the change feed container
        #[arg(short, long)]
        root: PathBuf,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
