//! Lazy per-source loaders on a process entry.
//!
//! The first fetch of a source in a cycle reads and parses it; later fetches
//! in the same cycle return the cached view. A failed read is cached as
//! `NoData` until the next reconciliation. Allocation failure is returned as
//! is and leaves the source stale, so only that fetch fails.

use std::fs;
use std::path::Path;
use tracing::{debug, trace};

use crate::buffer::ProcBuffer;
use crate::error::{ProcError, Result};
use crate::process::cgroup::reformat_cgroup;
use crate::process::entry::{FetchState, InternedView, ProcessEntry, Slot, StatView, TextView};
use crate::process::io::IoView;
use crate::process::status::StatusView;
use crate::process::{Pid, Source};
use crate::strings::{Interner, StringId};

/// Runs `load` if the slot is stale and maps the slot state to a result.
fn resolve<'a, V>(
    slot: &'a mut Slot<V>,
    pid: Pid,
    source: Source,
    load: impl FnOnce(&mut V) -> Result<()>,
) -> Result<&'a V> {
    if slot.state == FetchState::Stale {
        match load(&mut slot.view) {
            Ok(()) => slot.state = FetchState::Ready,
            Err(e @ ProcError::Alloc { .. }) => return Err(e),
            Err(e) => {
                debug!(pid, %source, error = %e, "source unavailable this cycle");
                slot.state = FetchState::NoData;
            }
        }
    }
    match slot.state {
        FetchState::Ready => Ok(&slot.view),
        _ => Err(ProcError::NoData { pid, kind: source }),
    }
}

/// Loads a file that must not be empty.
fn load_nonempty(buf: &mut ProcBuffer, path: &Path) -> Result<()> {
    let n = buf.load(path)?;
    trace!(path = %path.display(), bytes = n, "read");
    if n == 0 {
        return Err(ProcError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

impl ProcessEntry {
    pub(crate) fn fetch_stat(&mut self, dir: &Path) -> Result<&StatView> {
        let pid = self.pid();
        resolve(&mut self.stat, pid, Source::Stat, |view| {
            load_nonempty(&mut view.stat.buf, &dir.join("stat"))?;
            // kernels without wchan, or with it restricted, are not an error
            view.has_wchan = match view.wchan.buf.load(&dir.join("wchan")) {
                Ok(n) => n > 0,
                Err(e @ ProcError::Alloc { .. }) => return Err(e),
                Err(_) => false,
            };
            Ok(())
        })
    }

    pub(crate) fn fetch_status(&mut self, dir: &Path) -> Result<&StatusView> {
        let pid = self.pid();
        resolve(&mut self.status, pid, Source::Status, |view| {
            load_nonempty(&mut view.buf, &dir.join("status"))?;
            view.reparse();
            Ok(())
        })
    }

    pub(crate) fn fetch_statm(&mut self, dir: &Path) -> Result<&TextView> {
        let pid = self.pid();
        resolve(&mut self.statm, pid, Source::Statm, |view| {
            load_nonempty(&mut view.buf, &dir.join("statm"))
        })
    }

    pub(crate) fn fetch_schedstat(&mut self, dir: &Path) -> Result<&TextView> {
        let pid = self.pid();
        resolve(&mut self.schedstat, pid, Source::Schedstat, |view| {
            load_nonempty(&mut view.buf, &dir.join("schedstat"))
        })
    }

    /// An empty maps file (kernel thread, zombie) is valid and yields `""`.
    pub(crate) fn fetch_maps(&mut self, dir: &Path) -> Result<&TextView> {
        let pid = self.pid();
        resolve(&mut self.maps, pid, Source::Maps, |view| {
            view.buf.load(&dir.join("maps")).map(|_| ())
        })
    }

    pub(crate) fn fetch_io(&mut self, dir: &Path) -> Result<&IoView> {
        let pid = self.pid();
        resolve(&mut self.io, pid, Source::Io, |view| {
            load_nonempty(&mut view.buf, &dir.join("io"))?;
            view.reparse();
            Ok(())
        })
    }

    pub(crate) fn fetch_fd(&mut self, dir: &Path) -> Result<u32> {
        let pid = self.pid();
        resolve(&mut self.fd, pid, Source::Fd, |count| {
            let path = dir.join("fd");
            // read_dir never yields the "." and ".." entries
            let entries = fs::read_dir(&path).map_err(|source| ProcError::Read {
                path: path.clone(),
                source,
            })?;
            *count = entries.count() as u32;
            Ok(())
        })
        .copied()
    }

    pub(crate) fn fetch_cgroup<I: Interner + ?Sized>(
        &mut self,
        dir: &Path,
        strings: &mut I,
    ) -> Result<StringId> {
        let pid = self.pid();
        resolve(&mut self.cgroup, pid, Source::Cgroup, |view| {
            load_interned(view, &dir.join("cgroup"), |raw| {
                strings.intern(&reformat_cgroup(raw))
            })
        })
        .map(|view| view.id)
    }

    pub(crate) fn fetch_label<I: Interner + ?Sized>(
        &mut self,
        dir: &Path,
        strings: &mut I,
    ) -> Result<StringId> {
        let pid = self.pid();
        resolve(&mut self.security, pid, Source::Label, |view| {
            load_interned(view, &dir.join(Source::Label.file()), |raw| {
                strings.intern(raw.trim_end_matches(['\n', '\0']))
            })
        })
        .map(|view| view.id)
    }
}

fn load_interned(
    view: &mut InternedView,
    path: &Path,
    intern: impl FnOnce(&str) -> StringId,
) -> Result<()> {
    load_nonempty(&mut view.buf, path)?;
    view.id = intern(&view.buf.to_string_lossy());
    Ok(())
}
