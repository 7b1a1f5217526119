//! Command line arguments
//!
//! Commands:
//! - shardplan plan [--config <path>]
//! - shardplan explain [--config <path>]
//! - shardplan run [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// shardplan - distributed search planning and result collection
#[derive(Parser, Debug)]
#[command(name = "shardplan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan each search request read from stdin
    Plan {
        /// Path to configuration file; defaults apply when absent
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Summarise the plan of each search request read from stdin
    Explain {
        /// Path to configuration file; defaults apply when absent
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Plan, reduce and gather each `{request, shards}` job read from stdin
    Run {
        /// Path to configuration file; defaults apply when absent
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Command {
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Plan { config } | Command::Explain { config } | Command::Run { config } => {
                config.as_ref()
            }
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
