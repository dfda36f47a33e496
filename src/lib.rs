//! Herakles Process Cache Library
//!
//! Live process-table cache and lazy per-process refresh engine for Linux
//! host monitoring agents.
//!
//! # Features
//!
//! - **Process Enumeration**: ascending pid snapshots, optionally with threads
//!   or restricted to one control group
//! - **Mark-Sweep Reconciliation**: a pid-indexed cache that adds new processes
//!   and reaps exited ones once per cycle
//! - **Lazy Sources**: stat/wchan, status, statm, schedstat, maps, io, fd count,
//!   cgroup and security label, each read at most once per cycle
//! - **Buffer Reuse**: per-source buffers survive across cycles and only grow
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_proc_cache::{Enumerator, ProcessCache, Scope, StatusLine, StringTable};
//!
//! let mut enumerator = Enumerator::new("/proc");
//! let mut cache = ProcessCache::new("/proc");
//! let mut strings = StringTable::new();
//!
//! cache.refresh(&mut enumerator, &Scope::all())?;
//! let pids: Vec<u32> = cache.instances().iter().map(|i| i.pid).collect();
//! for pid in pids {
//!     if let Ok(status) = cache.fetch_status(pid) {
//!         println!("{pid}: rss={:?} kB", status.number(StatusLine::VmRss));
//!     }
//!     let _ = cache.fetch_cgroup(pid, &mut strings);
//! }
//! # Ok::<(), herakles_proc_cache::ProcError>(())
//! ```

pub mod buffer;
pub mod error;
pub mod fields;
pub mod process;
pub mod strings;

// Re-export main types for convenience
pub use buffer::ProcBuffer;
pub use error::ProcError;
pub use fields::{extract_field, parse_field};
pub use process::{
    Enumerator, FetchState, Instance, IoLine, IoView, Pid, ProcessCache, ProcessEntry, Scope,
    Source, StatView, StatusLine, StatusView, TextView,
};
pub use strings::{Interner, StringId, StringTable};
