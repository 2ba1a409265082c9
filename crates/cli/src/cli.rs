//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Triggersync - synchronized capture markers and hardware trigger pulses
#[derive(Parser, Debug)]
#[command(
    name = "triggersync",
    author,
    version,
    about = "Synchronized motion-capture recording with hardware event triggers",
    long_about = "Drives a motion-capture recording session and emits a software \n\
                  marker and a hardware pulse as one synchronized event at task \n\
                  start/end. Optionally classifies streamed force-plate data into \n\
                  heel-strike/toe-off events online and fires per-event trigger codes."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TRIGGERSYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TRIGGERSYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a recording
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "recording.toml",
        env = "TRIGGERSYNC_CONFIG"
    )]
    pub config: PathBuf,

    /// Override capture host from configuration
    #[arg(long, env = "TRIGGERSYNC_HOST")]
    pub host: Option<String>,

    /// Override capture RT port from configuration
    #[arg(long, env = "TRIGGERSYNC_PORT")]
    pub port: Option<u16>,

    /// Override capture duration in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Subject identifier used for the default output name
    #[arg(long, default_value = "01", env = "TRIGGERSYNC_SUBJECT")]
    pub subject: String,

    /// Task identifier used for the default output name
    #[arg(long, default_value = "walking", env = "TRIGGERSYNC_TASK")]
    pub task: String,

    /// Output path for the saved session (overrides the derived name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable hardware trigger output
    #[arg(long)]
    pub triggers: bool,

    /// Enable online gait-event detection on the sample stream
    #[arg(long)]
    pub gait: bool,

    /// Override the TaskStart trigger code
    #[arg(long)]
    pub start_code: Option<u8>,

    /// Override the TaskEnd trigger code
    #[arg(long)]
    pub end_code: Option<u8>,

    /// Override the right heel-strike trigger code
    #[arg(long)]
    pub rhs_code: Option<u8>,

    /// Override the right toe-off trigger code
    #[arg(long)]
    pub rto_code: Option<u8>,

    /// Override the left heel-strike trigger code
    #[arg(long)]
    pub lhs_code: Option<u8>,

    /// Override the left toe-off trigger code
    #[arg(long)]
    pub lto_code: Option<u8>,

    /// Run against the built-in mock client (no capture system required)
    #[arg(long)]
    pub mock: bool,

    /// Validate configuration and exit without recording
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for the sample path
    #[arg(long, default_value = "100", env = "TRIGGERSYNC_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TRIGGERSYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "recording.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "recording.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
