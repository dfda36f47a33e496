//! CLI command implementations for herakles-proc-cache.
//!
//! This module provides implementations for all CLI subcommands:
//! - `sample`: Reconciliation cycles with per-source fetches
//! - `inspect`: Every source of one process
//! - `check`: System validation
//! - `config`: Configuration file generation

pub mod check;
pub mod config;
pub mod inspect;
pub mod sample;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use inspect::command_inspect;
pub use sample::command_sample;
