//! Parser for `/proc/<pid>/status`.
//!
//! Lines are located by key rather than by position. Kernels have added
//! lines inside the memory block over time (`VmPin`, `VmHWM`, `RssAnon`,
//! `HugetlbPages`, ...) and between `SigPnd` and `SigBlk` (`ShdPnd`), so a
//! positional walk reads the wrong lines on current kernels. The memory block
//! only counts when `VmSize:` is present; kernel threads have no memory block
//! and still get their credentials and signal masks.

use crate::buffer::ProcBuffer;
use crate::fields::{byte_line_spans, line_value, Span};

/// The lines exposed from a status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLine {
    Uid,
    Gid,
    VmSize,
    VmLck,
    VmRss,
    VmData,
    VmStk,
    VmExe,
    VmLib,
    VmSwap,
    Threads,
    SigPnd,
    SigBlk,
    SigIgn,
    SigCgt,
}

const LINE_COUNT: usize = 15;

impl StatusLine {
    pub const MEMORY: [StatusLine; 9] = [
        StatusLine::VmSize,
        StatusLine::VmLck,
        StatusLine::VmRss,
        StatusLine::VmData,
        StatusLine::VmStk,
        StatusLine::VmExe,
        StatusLine::VmLib,
        StatusLine::VmSwap,
        StatusLine::Threads,
    ];

    pub const SIGNALS: [StatusLine; 4] = [
        StatusLine::SigPnd,
        StatusLine::SigBlk,
        StatusLine::SigIgn,
        StatusLine::SigCgt,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StatusLine::Uid => "Uid",
            StatusLine::Gid => "Gid",
            StatusLine::VmSize => "VmSize",
            StatusLine::VmLck => "VmLck",
            StatusLine::VmRss => "VmRSS",
            StatusLine::VmData => "VmData",
            StatusLine::VmStk => "VmStk",
            StatusLine::VmExe => "VmExe",
            StatusLine::VmLib => "VmLib",
            StatusLine::VmSwap => "VmSwap",
            StatusLine::Threads => "Threads",
            StatusLine::SigPnd => "SigPnd",
            StatusLine::SigBlk => "SigBlk",
            StatusLine::SigIgn => "SigIgn",
            StatusLine::SigCgt => "SigCgt",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Spans of the interesting lines within a status buffer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusLines {
    spans: [Option<Span>; LINE_COUNT],
}

impl StatusLines {
    pub fn get(&self, line: StatusLine) -> Option<Span> {
        self.spans[line.index()]
    }

    fn set(&mut self, line: StatusLine, span: Span) {
        self.spans[line.index()] = Some(span);
    }
}

/// Locates the credential, memory and signal lines in `text`.
pub fn parse_status(text: &str) -> StatusLines {
    parse_status_bytes(text.as_bytes())
}

/// Same as [`parse_status`] over raw bytes. Keys are matched as bytes so a
/// `Name:` line holding a cut multi-byte character does not hide the rest.
pub fn parse_status_bytes(bytes: &[u8]) -> StatusLines {
    let mut out = StatusLines::default();
    let mut in_memory = false;
    let mut in_signals = false;

    for span in byte_line_spans(bytes) {
        let line = span.slice_bytes(bytes);
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let key = &line[..colon];
        match key {
            b"Uid" => out.set(StatusLine::Uid, span),
            b"Gid" => out.set(StatusLine::Gid, span),
            b"VmSize" => {
                in_memory = true;
                out.set(StatusLine::VmSize, span);
            }
            b"SigPnd" => {
                in_memory = false;
                in_signals = true;
                out.set(StatusLine::SigPnd, span);
            }
            _ if in_memory => {
                if let Some(&field) = StatusLine::MEMORY.iter().find(|l| l.key().as_bytes() == key) {
                    out.set(field, span);
                }
            }
            _ if in_signals => {
                if let Some(&field) = StatusLine::SIGNALS.iter().find(|l| l.key().as_bytes() == key) {
                    out.set(field, span);
                    if field == StatusLine::SigCgt {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Parsed view over a status record.
#[derive(Debug, Default)]
pub struct StatusView {
    pub(crate) buf: ProcBuffer,
    pub(crate) lines: StatusLines,
}

impl StatusView {
    pub(crate) fn reparse(&mut self) {
        self.lines = parse_status_bytes(self.buf.as_bytes());
    }

    /// The whole line, e.g. `"VmRSS:\t  1234 kB"`.
    pub fn line(&self, line: StatusLine) -> Option<&str> {
        self.lines.get(line)?.text(self.buf.as_bytes())
    }

    /// The trimmed value part of the line, e.g. `"1234 kB"`.
    pub fn value(&self, line: StatusLine) -> Option<&str> {
        self.line(line).map(line_value)
    }

    /// True when the record carried a `VmSize:` memory block.
    pub fn has_memory(&self) -> bool {
        self.lines.get(StatusLine::VmSize).is_some()
    }

    pub fn has_signals(&self) -> bool {
        self.lines.get(StatusLine::SigPnd).is_some()
    }

    /// Real, effective, saved and filesystem ids from the `Uid:` or `Gid:` line.
    pub fn ids(&self, line: StatusLine) -> Option<[u32; 4]> {
        let mut parts = self.value(line)?.split_ascii_whitespace();
        let mut ids = [0u32; 4];
        for id in ids.iter_mut() {
            *id = parts.next()?.parse().ok()?;
        }
        Some(ids)
    }

    /// Numeric part of a memory line in kB, or the thread count.
    pub fn number(&self, line: StatusLine) -> Option<u64> {
        self.value(line)?.split_ascii_whitespace().next()?.parse().ok()
    }

    /// Signal mask parsed from its hexadecimal form.
    pub fn signal_mask(&self, line: StatusLine) -> Option<u64> {
        u64::from_str_radix(self.value(line)?, 16).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Layout of older 2.6-era kernels: no VmPin, VmPTE between VmLib and VmSwap.
    const LEGACY: &str = "Name:\tbash\n\
State:\tS (sleeping)\n\
Tgid:\t4242\n\
Pid:\t4242\n\
PPid:\t1\n\
TracerPid:\t0\n\
Uid:\t1000\t1000\t1000\t1000\n\
Gid:\t100\t100\t100\t100\n\
FDSize:\t256\n\
Groups:\t100\n\
VmPeak:\t  21000 kB\n\
VmSize:\t  20000 kB\n\
VmLck:\t       0 kB\n\
VmHWM:\t   5000 kB\n\
VmRSS:\t   4800 kB\n\
VmData:\t   1500 kB\n\
VmStk:\t    136 kB\n\
VmExe:\t    900 kB\n\
VmLib:\t   2100 kB\n\
VmPTE:\t     60 kB\n\
VmSwap:\t      0 kB\n\
Threads:\t1\n\
SigQ:\t0/63404\n\
SigPnd:\t0000000000000000\n\
SigBlk:\t0000000000010000\n\
SigIgn:\t0000000000384004\n\
SigCgt:\t000000004b813efb\n\
CapInh:\t0000000000000000\n";

    // Layout of current kernels.
    const MODERN: &str = "Name:\tsshd\n\
Umask:\t0022\n\
State:\tS (sleeping)\n\
Uid:\t0\t0\t0\t0\n\
Gid:\t0\t0\t0\t0\n\
NStgid:\t812\n\
VmPeak:\t   15000 kB\n\
VmSize:\t   14800 kB\n\
VmLck:\t       0 kB\n\
VmPin:\t       0 kB\n\
VmHWM:\t    9000 kB\n\
VmRSS:\t    8700 kB\n\
RssAnon:\t    1100 kB\n\
RssFile:\t    7600 kB\n\
RssShmem:\t       0 kB\n\
VmData:\t     900 kB\n\
VmStk:\t     132 kB\n\
VmExe:\t     800 kB\n\
VmLib:\t    9200 kB\n\
VmPTE:\t      64 kB\n\
VmSwap:\t      12 kB\n\
HugetlbPages:\t       0 kB\n\
CoreDumping:\t0\n\
THP_enabled:\t1\n\
Threads:\t3\n\
SigQ:\t0/31412\n\
SigPnd:\t0000000000000000\n\
ShdPnd:\t0000000000000004\n\
SigBlk:\t0000000000000000\n\
SigIgn:\t0000000000001000\n\
SigCgt:\t0000000180014007\n\
CapInh:\t0000000000000000\n";

    // Kernel thread: no memory block at all.
    const KTHREAD: &str = "Name:\tkworker/0:1\n\
State:\tI (idle)\n\
Uid:\t0\t0\t0\t0\n\
Gid:\t0\t0\t0\t0\n\
Threads:\t1\n\
SigQ:\t0/31412\n\
SigPnd:\t0000000000000000\n\
ShdPnd:\t0000000000000000\n\
SigBlk:\t0000000000000000\n\
SigIgn:\tffffffffffffffff\n\
SigCgt:\t0000000000000000\n";

    fn view(text: &str) -> StatusView {
        let mut view = StatusView::default();
        view.buf.set(text.as_bytes()).unwrap();
        view.reparse();
        view
    }

    #[test]
    fn test_legacy_layout() {
        let v = view(LEGACY);
        assert_eq!(v.ids(StatusLine::Uid), Some([1000; 4]));
        assert_eq!(v.ids(StatusLine::Gid), Some([100; 4]));
        assert_eq!(v.number(StatusLine::VmSize), Some(20000));
        assert_eq!(v.number(StatusLine::VmLck), Some(0));
        assert_eq!(v.number(StatusLine::VmRss), Some(4800));
        assert_eq!(v.number(StatusLine::VmData), Some(1500));
        assert_eq!(v.number(StatusLine::VmStk), Some(136));
        assert_eq!(v.number(StatusLine::VmExe), Some(900));
        assert_eq!(v.number(StatusLine::VmLib), Some(2100));
        assert_eq!(v.number(StatusLine::VmSwap), Some(0));
        assert_eq!(v.number(StatusLine::Threads), Some(1));
        assert_eq!(v.signal_mask(StatusLine::SigBlk), Some(0x10000));
        assert_eq!(v.signal_mask(StatusLine::SigCgt), Some(0x4b813efb));
    }

    #[test]
    fn test_modern_layout_skips_extra_lines() {
        let v = view(MODERN);
        assert_eq!(v.line(StatusLine::VmRss), Some("VmRSS:\t    8700 kB"));
        assert_eq!(v.number(StatusLine::VmData), Some(900));
        assert_eq!(v.number(StatusLine::VmSwap), Some(12));
        assert_eq!(v.number(StatusLine::Threads), Some(3));
        // ShdPnd must not be mistaken for SigBlk
        assert_eq!(v.signal_mask(StatusLine::SigBlk), Some(0));
        assert_eq!(v.signal_mask(StatusLine::SigIgn), Some(0x1000));
        assert_eq!(v.signal_mask(StatusLine::SigCgt), Some(0x180014007));
    }

    #[test]
    fn test_kernel_thread_has_signals_without_memory() {
        let v = view(KTHREAD);
        assert!(!v.has_memory());
        assert!(v.has_signals());
        for line in StatusLine::MEMORY {
            assert_eq!(v.line(line), None, "{line:?}");
        }
        assert_eq!(v.value(StatusLine::SigPnd), Some("0000000000000000"));
        assert_eq!(v.signal_mask(StatusLine::SigIgn), Some(u64::MAX));
        assert_eq!(v.ids(StatusLine::Uid), Some([0; 4]));
    }

    #[test]
    fn test_truncated_record_is_partial() {
        let v = view("Name:\tx\nUid:\t5\t5\t5\t5\n");
        assert_eq!(v.ids(StatusLine::Uid), Some([5; 4]));
        assert_eq!(v.line(StatusLine::Gid), None);
        assert!(!v.has_memory());
        assert!(!v.has_signals());
    }

    #[test]
    fn test_non_utf8_name_keeps_later_lines() {
        // comm cut at 15 bytes in the middle of a multi-byte character
        let mut raw = b"Name:\tworker-\xe4\xb8\n".to_vec();
        raw.extend_from_slice(MODERN.split_once('\n').unwrap().1.as_bytes());

        let mut v = StatusView::default();
        v.buf.set(&raw).unwrap();
        v.reparse();

        assert_eq!(v.ids(StatusLine::Uid), Some([0; 4]));
        assert_eq!(v.number(StatusLine::VmRss), Some(8700));
        assert_eq!(v.signal_mask(StatusLine::SigCgt), Some(0x180014007));
    }

    #[test]
    fn test_empty_record() {
        assert_eq!(parse_status(""), StatusLines::default());
    }
}
