//! Per-process cache entry and the cached views it owns.
//!
//! Each source keeps its own buffer and fetch state. Reconciliation marks
//! every state stale but keeps the buffers, so the next fetch reuses the
//! allocation.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::buffer::ProcBuffer;
use crate::fields::{extract_field, parse_field};
use crate::process::io::IoView;
use crate::process::status::StatusView;
use crate::strings::StringId;

/// Process or thread identifier.
pub type Pid = u32;

/// The nine lazily fetched per-process sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// `stat` plus the optional `wchan` string.
    Stat,
    Status,
    Statm,
    Schedstat,
    Maps,
    Io,
    Fd,
    Cgroup,
    /// Security context from `attr/current`.
    Label,
}

impl Source {
    pub const ALL: [Source; 9] = [
        Source::Stat,
        Source::Status,
        Source::Statm,
        Source::Schedstat,
        Source::Maps,
        Source::Io,
        Source::Fd,
        Source::Cgroup,
        Source::Label,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Source::Stat => "stat",
            Source::Status => "status",
            Source::Statm => "statm",
            Source::Schedstat => "schedstat",
            Source::Maps => "maps",
            Source::Io => "io",
            Source::Fd => "fd",
            Source::Cgroup => "cgroup",
            Source::Label => "label",
        }
    }

    /// Path of the source below `/proc/<pid>`.
    pub fn file(self) -> &'static str {
        match self {
            Source::Label => "attr/current",
            other => other.name(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown process source '{0}'")]
pub struct UnknownSource(pub String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|src| src.name() == s)
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// Freshness of one cached view within the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    /// Not read since the last reconciliation.
    #[default]
    Stale,
    /// Read and parsed this cycle.
    Ready,
    /// Read attempted this cycle and failed; no data until the next cycle.
    NoData,
}

impl FetchState {
    pub fn is_fetched(self) -> bool {
        self != FetchState::Stale
    }
}

#[derive(Debug, Default)]
pub(crate) struct Slot<V> {
    pub(crate) view: V,
    pub(crate) state: FetchState,
}

/// Raw text record such as `statm`, `schedstat` or `maps`.
#[derive(Debug, Default)]
pub struct TextView {
    pub(crate) buf: ProcBuffer,
}

impl TextView {
    /// Content with trailing newlines and NULs removed.
    pub fn text(&self) -> Cow<'_, str> {
        match self.buf.to_string_lossy() {
            Cow::Borrowed(s) => Cow::Borrowed(s.trim_end_matches(['\n', '\0'])),
            Cow::Owned(s) => Cow::Owned(s.trim_end_matches(['\n', '\0']).to_string()),
        }
    }

    /// Whitespace-delimited token `index`, empty if out of range.
    pub fn field(&self, index: usize) -> String {
        extract_field(&self.text(), index)
    }

    pub fn parse_field<T: FromStr>(&self, index: usize) -> Option<T> {
        parse_field(&self.text(), index)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

/// `stat` record together with the wait channel.
#[derive(Debug, Default)]
pub struct StatView {
    pub(crate) stat: TextView,
    pub(crate) wchan: TextView,
    pub(crate) has_wchan: bool,
}

impl StatView {
    pub fn text(&self) -> Cow<'_, str> {
        self.stat.text()
    }

    pub fn field(&self, index: usize) -> String {
        self.stat.field(index)
    }

    pub fn parse_field<T: FromStr>(&self, index: usize) -> Option<T> {
        self.stat.parse_field(index)
    }

    /// Command name between the outermost parentheses of field 1.
    pub fn comm(&self) -> Option<String> {
        let text = self.stat.text();
        let open = text.find('(')?;
        let close = text.rfind(')')?;
        (close > open).then(|| text[open + 1..close].to_string())
    }

    /// Kernel wait channel; `None` when the kernel has no `wchan` file.
    pub fn wchan(&self) -> Option<Cow<'_, str>> {
        self.has_wchan.then(|| self.wchan.text())
    }
}

/// Interned result of the cgroup or label sources.
#[derive(Debug, Default)]
pub(crate) struct InternedView {
    pub(crate) buf: ProcBuffer,
    pub(crate) id: StringId,
}

/// Cached state for one process or thread.
#[derive(Debug)]
pub struct ProcessEntry {
    pid: Pid,
    label: Arc<str>,
    pub(crate) valid: bool,
    pub(crate) stat: Slot<StatView>,
    pub(crate) status: Slot<StatusView>,
    pub(crate) statm: Slot<TextView>,
    pub(crate) schedstat: Slot<TextView>,
    pub(crate) maps: Slot<TextView>,
    pub(crate) io: Slot<IoView>,
    pub(crate) fd: Slot<u32>,
    pub(crate) cgroup: Slot<InternedView>,
    pub(crate) security: Slot<InternedView>,
}

impl ProcessEntry {
    pub(crate) fn new(pid: Pid, label: impl Into<Arc<str>>) -> Self {
        Self {
            pid,
            label: label.into(),
            valid: true,
            stat: Slot::default(),
            status: Slot::default(),
            statm: Slot::default(),
            schedstat: Slot::default(),
            maps: Slot::default(),
            io: Slot::default(),
            fd: Slot::default(),
            cgroup: Slot::default(),
            security: Slot::default(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Display label captured when the entry was created.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn shared_label(&self) -> Arc<str> {
        Arc::clone(&self.label)
    }

    pub fn fetch_state(&self, source: Source) -> FetchState {
        match source {
            Source::Stat => self.stat.state,
            Source::Status => self.status.state,
            Source::Statm => self.statm.state,
            Source::Schedstat => self.schedstat.state,
            Source::Maps => self.maps.state,
            Source::Io => self.io.state,
            Source::Fd => self.fd.state,
            Source::Cgroup => self.cgroup.state,
            Source::Label => self.security.state,
        }
    }

    /// Allocated bytes behind a source's cached view.
    pub fn buffer_capacity(&self, source: Source) -> usize {
        match source {
            Source::Stat => self.stat.view.stat.capacity() + self.stat.view.wchan.capacity(),
            Source::Status => self.status.view.buf.capacity(),
            Source::Statm => self.statm.view.capacity(),
            Source::Schedstat => self.schedstat.view.capacity(),
            Source::Maps => self.maps.view.capacity(),
            Source::Io => self.io.view.buf.capacity(),
            Source::Fd => 0,
            Source::Cgroup => self.cgroup.view.buf.capacity(),
            Source::Label => self.security.view.buf.capacity(),
        }
    }

    /// Starts a new cycle for this entry: not yet seen, nothing fetched.
    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
        self.stat.state = FetchState::Stale;
        self.status.state = FetchState::Stale;
        self.statm.state = FetchState::Stale;
        self.schedstat.state = FetchState::Stale;
        self.maps.state = FetchState::Stale;
        self.io.state = FetchState::Stale;
        self.fd.state = FetchState::Stale;
        self.cgroup.state = FetchState::Stale;
        self.security.state = FetchState::Stale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip_names() {
        for src in Source::ALL {
            assert_eq!(src.name().parse::<Source>().unwrap(), src);
        }
        assert!("smaps".parse::<Source>().is_err());
        assert_eq!(Source::Label.file(), "attr/current");
    }

    #[test]
    fn test_invalidate_resets_every_state() {
        let mut entry = ProcessEntry::new(7, "000007 init");
        entry.stat.state = FetchState::Ready;
        entry.cgroup.state = FetchState::NoData;
        entry.security.state = FetchState::Ready;

        entry.invalidate();

        assert!(!entry.valid);
        for src in Source::ALL {
            assert_eq!(entry.fetch_state(src), FetchState::Stale, "{src}");
        }
    }

    #[test]
    fn test_stat_view_comm_and_fields() {
        let mut view = StatView::default();
        view.stat
            .buf
            .set(b"42 (my (odd) name) S 1 42 42 0 -1\n")
            .unwrap();
        assert_eq!(view.comm().as_deref(), Some("my (odd) name"));
        assert_eq!(view.field(0), "42");
        assert_eq!(view.wchan(), None);
    }
}
