//! CLI arguments and subcommands for herakles-proc-cache.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for process samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-proc-cache",
    about = "Live /proc process-table cache with lazy per-process sources",
    long_about = "Live /proc process-table cache with lazy per-process sources.\n\n\
                  Enumerates processes (optionally threads, optionally one control group) \
                  once per cycle, reconciles them against a pid-indexed cache and reads \
                  stat, status, statm, schedstat, maps, io, fd, cgroup and security label \
                  data on demand.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "More info: https://www.herakles.now — Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides log_level from the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Process root to read from
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Include threads as separate instances
    #[arg(long)]
    pub threads: bool,

    /// Restrict to members of this control-group directory
    #[arg(long)]
    pub cgroup: Option<PathBuf>,

    /// Interval between sampling cycles in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Sources to fetch each cycle (comma-separated, e.g. "stat,status,io")
    #[arg(long)]
    pub sources: Option<String>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run sampling cycles and report what was fetched
    Sample {
        /// Number of cycles
        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        /// Output format for per-process samples
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Print self-telemetry in Prometheus text format after the last cycle
        #[arg(long)]
        metrics: bool,

        /// Show every sampled process
        #[arg(long)]
        verbose: bool,
    },

    /// Show every source for one process
    Inspect {
        /// Process or thread id
        #[arg(short = 'p', long)]
        pid: u32,

        /// Also print the full memory map listing
        #[arg(long)]
        maps: bool,
    },

    /// Validate configuration and system requirements
    Check {
        /// Check the process root
        #[arg(long)]
        proc: bool,

        /// Check that each source is readable for this process
        #[arg(long)]
        sources: bool,

        /// Check all system requirements
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}
