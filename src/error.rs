//! Error types for the process cache.
//!
//! Enumeration failures are fatal to a refresh cycle and propagate to the
//! caller. Per-source read failures are soft: they are logged and cached as
//! `NoData` for the rest of the cycle without evicting the process entry.

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;

use crate::process::{Pid, Source};

/// Errors produced by enumeration, buffer growth and per-source fetches.
#[derive(Debug, thiserror::Error)]
pub enum ProcError {
    #[error("cannot read process root {}: {source}", path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} returned no content", path.display())]
    Empty { path: PathBuf },

    #[error("cannot grow buffer to {requested} bytes: {source}")]
    Alloc {
        requested: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("pid {0} is not in the process cache")]
    NotCached(Pid),

    #[error("no {kind} data for pid {pid} this cycle")]
    NoData { pid: Pid, kind: Source },
}

impl ProcError {
    /// The OS error code behind an enumeration or read failure, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ProcError::Enumerate { source, .. } | ProcError::Read { source, .. } => {
                source.raw_os_error()
            }
            _ => None,
        }
    }

    /// True for the soft per-source outcomes (`NoData` and the read failures
    /// that are downgraded to it).
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            ProcError::NoData { .. } | ProcError::Read { .. } | ProcError::Empty { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ProcError>;
