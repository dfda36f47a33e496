//! Process discovery.
//!
//! Produces the ascending pid snapshot for one cycle, either from the
//! numeric entries of the process root (optionally with each process's
//! threads) or from a control group's membership file.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{ProcError, Result};
use crate::process::Pid;

/// Which processes a cycle covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Also list every thread of every process.
    #[serde(default)]
    pub threads: bool,
    /// Restrict to members of this control-group directory.
    #[serde(default)]
    pub cgroup: Option<PathBuf>,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_threads() -> Self {
        Self {
            threads: true,
            cgroup: None,
        }
    }

    pub fn cgroup(path: impl Into<PathBuf>, threads: bool) -> Self {
        Self {
            threads,
            cgroup: Some(path.into()),
        }
    }

    /// The cgroup directory, ignoring an empty path.
    fn cgroup_dir(&self) -> Option<&Path> {
        self.cgroup
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Owns the pid snapshot and the storage behind it.
#[derive(Debug)]
pub struct Enumerator {
    root: PathBuf,
    pids: Vec<Pid>,
}

impl Enumerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pids: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The snapshot from the last successful call to [`enumerate`](Self::enumerate).
    pub fn snapshot(&self) -> &[Pid] {
        &self.pids
    }

    /// Replaces the snapshot with the current, ascending pid set for `scope`.
    ///
    /// Fails only when the process root itself cannot be read; a missing or
    /// empty cgroup membership file yields an empty snapshot.
    pub fn enumerate(&mut self, scope: &Scope) -> Result<&[Pid]> {
        match scope.cgroup_dir() {
            Some(dir) => self.enumerate_cgroup(dir, scope.threads),
            None => self.enumerate_global(scope.threads)?,
        }
        debug!(
            pids = self.pids.len(),
            threads = scope.threads,
            cgroup = ?scope.cgroup,
            "enumerated processes"
        );
        Ok(&self.pids)
    }

    fn enumerate_global(&mut self, threads: bool) -> Result<()> {
        let entries = fs::read_dir(&self.root).map_err(|source| ProcError::Enumerate {
            path: self.root.clone(),
            source,
        })?;

        self.pids.clear();
        // readdir on the process root lists thread-group leaders only
        for entry in entries.flatten() {
            let Some(pid) = parse_pid(&entry.file_name()) else {
                continue;
            };
            self.pids.push(pid);
            if threads {
                append_tasks(&mut self.pids, &entry.path(), pid);
            }
        }

        self.pids.sort_unstable();
        self.pids.dedup();
        Ok(())
    }

    fn enumerate_cgroup(&mut self, dir: &Path, threads: bool) {
        let file = if threads { "tasks" } else { "cgroup.procs" };
        let path = dir.join(file);

        self.pids.clear();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cgroup membership unavailable");
                return;
            }
        };

        self.pids.extend(content.lines().filter_map(|line| {
            let line = line.trim();
            let pid = line.parse::<Pid>().ok();
            if pid.is_none() && !line.is_empty() {
                trace!(path = %path.display(), line, "skipping malformed membership line");
            }
            pid
        }));

        // the kernel emits these sorted, but do not rely on it
        if !self.pids.windows(2).all(|w| w[0] < w[1]) {
            self.pids.sort_unstable();
            self.pids.dedup();
        }
    }
}

/// Appends the thread ids of `pid` found under `<proc_dir>/task`,
/// skipping the main thread which is already listed.
fn append_tasks(pids: &mut Vec<Pid>, proc_dir: &Path, pid: Pid) {
    let Ok(tasks) = fs::read_dir(proc_dir.join("task")) else {
        // exited between the two readdirs
        return;
    };
    pids.extend(
        tasks
            .flatten()
            .filter_map(|t| parse_pid(&t.file_name()))
            .filter(|&tid| tid != pid),
    );
}

fn parse_pid(name: &OsStr) -> Option<Pid> {
    let name = name.to_str()?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
