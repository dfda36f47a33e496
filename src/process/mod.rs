//! Process-table cache and per-process /proc sources.
//!
//! This module provides:
//! - `enumerator`: pid discovery (global, threads, cgroup-scoped)
//! - `cache`: the pid-indexed cache and mark-sweep reconciliation
//! - `entry`: per-process cached views and their fetch state
//! - `fetch`: lazy per-source loaders
//! - `label`: one-time display labels
//! - `status`, `io`, `cgroup`: parsers for the structured sources

pub mod cache;
pub mod cgroup;
pub mod entry;
pub mod enumerator;
mod fetch;
pub mod io;
pub mod label;
pub mod status;

// Re-export commonly used types
pub use cache::{Instance, ProcessCache, ReconcileStats};
pub use cgroup::reformat_cgroup;
pub use entry::{FetchState, Pid, ProcessEntry, Source, StatView, TextView, UnknownSource};
pub use enumerator::{Enumerator, Scope};
pub use io::{IoLine, IoView};
pub use label::{build_label, join_cmdline};
pub use status::{parse_status, StatusLine, StatusLines, StatusView};
