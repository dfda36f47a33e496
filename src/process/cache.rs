//! Pid-indexed process cache and its mark-sweep reconciliation.
//!
//! Once per sampling cycle the caller hands the current pid snapshot to
//! [`ProcessCache::reconcile`]. Entries for new pids are created with their
//! display label, surviving entries have all their cached views marked stale,
//! and entries whose pid is gone are dropped with their buffers. Per-source
//! data is then fetched lazily through the `fetch_*` accessors.
//!
//! The cache is owned by one caller and is not internally synchronised. A
//! multi-threaded host must wrap it in a single lock held across `reconcile`
//! and each fetch.

use ahash::AHashMap as HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::error::{ProcError, Result};
use crate::process::enumerator::{Enumerator, Scope};
use crate::process::entry::{ProcessEntry, StatView, TextView};
use crate::process::io::IoView;
use crate::process::label::build_label;
use crate::process::status::StatusView;
use crate::process::{Pid, Source};
use crate::strings::{Interner, StringId};

/// One published instance: pid plus the label captured at discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub pid: Pid,
    pub label: Arc<str>,
}

/// Bookkeeping from the most recent reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub reaped: usize,
    pub entries: usize,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct ProcessCache {
    root: PathBuf,
    entries: HashMap<Pid, ProcessEntry>,
    instances: Vec<Instance>,
    last: ReconcileStats,
}

impl ProcessCache {
    /// Creates an empty cache reading per-process files below `root`
    /// (normally `/proc`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: HashMap::new(),
            instances: Vec::new(),
            last: ReconcileStats::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the per-process files for `pid`.
    pub fn pid_dir(&self, pid: Pid) -> PathBuf {
        self.root.join(pid.to_string())
    }

    /// Enumerates `scope` and reconciles the result. On enumeration failure
    /// the cache keeps its previous state.
    pub fn refresh(&mut self, enumerator: &mut Enumerator, scope: &Scope) -> Result<usize> {
        let snapshot = enumerator.enumerate(scope)?;
        Ok(self.reconcile(snapshot))
    }

    /// Brings the index in line with `snapshot` and returns the number of
    /// cached entries.
    ///
    /// Afterwards the index holds exactly one entry per pid in `snapshot`;
    /// pids missing from it are removed without any grace period.
    #[instrument(skip_all, fields(snapshot = snapshot.len()))]
    pub fn reconcile(&mut self, snapshot: &[Pid]) -> usize {
        let start = Instant::now();
        let before = self.entries.len();

        // mark
        for entry in self.entries.values_mut() {
            entry.invalidate();
        }

        let mut added = 0;
        self.instances.clear();
        self.instances.reserve_exact(snapshot.len());
        for &pid in snapshot {
            let root = &self.root;
            let entry = self.entries.entry(pid).or_insert_with(|| {
                added += 1;
                let label = build_label(&root.join(pid.to_string()), pid);
                ProcessEntry::new(pid, label)
            });
            entry.valid = true;
            self.instances.push(Instance {
                pid,
                label: entry.shared_label(),
            });
        }

        // sweep
        self.entries.retain(|_, entry| entry.valid);
        let reaped = before + added - self.entries.len();

        self.last = ReconcileStats {
            added,
            reaped,
            entries: self.entries.len(),
            duration: start.elapsed(),
        };
        debug!(
            entries = self.last.entries,
            added, reaped, "reconciled process cache"
        );
        self.entries.len()
    }

    /// The instance list from the last reconciliation, in snapshot order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn last_reconcile(&self) -> ReconcileStats {
        self.last
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.entries.contains_key(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessEntry> {
        self.entries.get(&pid)
    }

    /// Cached pids in no particular order.
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.entries.keys().copied()
    }

    fn entry_mut(&mut self, pid: Pid) -> Result<(&mut ProcessEntry, PathBuf)> {
        let dir = self.pid_dir(pid);
        let entry = self.entries.get_mut(&pid).ok_or(ProcError::NotCached(pid))?;
        Ok((entry, dir))
    }

    /// `stat` record and wait channel.
    pub fn fetch_stat(&mut self, pid: Pid) -> Result<&StatView> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_stat(&dir)
    }

    /// Credentials, memory summary and signal masks from `status`.
    pub fn fetch_status(&mut self, pid: Pid) -> Result<&StatusView> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_status(&dir)
    }

    /// Page-count memory summary from `statm`.
    pub fn fetch_statm(&mut self, pid: Pid) -> Result<&TextView> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_statm(&dir)
    }

    pub fn fetch_schedstat(&mut self, pid: Pid) -> Result<&TextView> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_schedstat(&dir)
    }

    /// Full memory-map listing. This can be large.
    pub fn fetch_maps(&mut self, pid: Pid) -> Result<&TextView> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_maps(&dir)
    }

    pub fn fetch_io(&mut self, pid: Pid) -> Result<&IoView> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_io(&dir)
    }

    /// Number of open file descriptors.
    pub fn fetch_fd(&mut self, pid: Pid) -> Result<u32> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_fd(&dir)
    }

    /// Interned id of the `;`-joined control-group set.
    pub fn fetch_cgroup<I: Interner + ?Sized>(
        &mut self,
        pid: Pid,
        strings: &mut I,
    ) -> Result<StringId> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_cgroup(&dir, strings)
    }

    /// Interned id of the security context.
    pub fn fetch_label<I: Interner + ?Sized>(
        &mut self,
        pid: Pid,
        strings: &mut I,
    ) -> Result<StringId> {
        let (entry, dir) = self.entry_mut(pid)?;
        entry.fetch_label(&dir, strings)
    }

    /// Fetches `source` for `pid`, discarding the view.
    pub fn fetch<I: Interner + ?Sized>(
        &mut self,
        pid: Pid,
        source: Source,
        strings: &mut I,
    ) -> Result<()> {
        match source {
            Source::Stat => self.fetch_stat(pid).map(|_| ()),
            Source::Status => self.fetch_status(pid).map(|_| ()),
            Source::Statm => self.fetch_statm(pid).map(|_| ()),
            Source::Schedstat => self.fetch_schedstat(pid).map(|_| ()),
            Source::Maps => self.fetch_maps(pid).map(|_| ()),
            Source::Io => self.fetch_io(pid).map(|_| ()),
            Source::Fd => self.fetch_fd(pid).map(|_| ()),
            Source::Cgroup => self.fetch_cgroup(pid, strings).map(|_| ()),
            Source::Label => self.fetch_label(pid, strings).map(|_| ()),
        }
    }
}
