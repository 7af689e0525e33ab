//! CLI parse: clap types for autoscribe. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Autoscribe CLI - scheduled content generation and comment queues
#[derive(Parser)]
#[command(name = "autoscribe")]
#[command(about = "Scheduled content generation with provider fallback and comment queues")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off, except for `run`)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the scheduler daemon until Ctrl-C
    Run,
    /// Evaluate the generation schedule once
    Tick,
    /// Run a generation cycle now, ignoring the next run time
    RunNow,
    /// Drain due comment actions once
    Drain,
    /// Generate an item and print it without saving
    Preview {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show automation status
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Pause all automation
    Pause,
    /// Resume after pause
    Resume,
    /// Block automation with a reason
    Block {
        /// Why automation is blocked
        reason: String,
    },
    /// Clear a block
    Unblock,
    /// Validate configuration
    Validate,
    /// Write a default config/config.toml into the workspace
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
