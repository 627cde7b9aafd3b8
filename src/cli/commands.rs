//! CLI command definitions using clap.
//!
//! - serve: run the HTTP service (default)
//! - tools, invoke, predict, version, health: talk to a running service
//! - optimize: run a hyperparameter search locally

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// forecast-mcp - MCP tool surface and cached model inference service
#[derive(Parser, Debug)]
#[command(name = "forecast-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_stderr: bool,

    /// Base URL of a running service (defaults to the configured address)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to bind, overrides config
        #[arg(short, long)]
        bind: Option<String>,

        /// Port to listen on, overrides config
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the tools a running service advertises
    Tools,

    /// Invoke a tool on a running service
    Invoke {
        /// Tool name (optimize, write_code, commit_to_github)
        name: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Request a prediction from a running service
    Predict {
        /// Features as a JSON object or array
        features: String,

        /// Text scored for sentiment
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Show the version tag of a running service
    Version,

    /// Show the health report of a running service
    Health,

    /// Run a hyperparameter search against the local training data
    Optimize {
        /// Number of trials
        #[arg(short, long)]
        trials: Option<usize>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Refit on all rows and replace the served model
        #[arg(long)]
        persist: bool,
    },
}
