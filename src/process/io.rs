//! Parser for `/proc/<pid>/io`.
//!
//! The kernel prints seven counters in a fixed order. Files are only present
//! on kernels built with task I/O accounting.

use crate::buffer::ProcBuffer;
use crate::fields::{byte_line_spans, line_value, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoLine {
    Rchar,
    Wchar,
    Syscr,
    Syscw,
    ReadBytes,
    WriteBytes,
    CancelledWriteBytes,
}

impl IoLine {
    /// Kernel order of the lines.
    pub const ALL: [IoLine; 7] = [
        IoLine::Rchar,
        IoLine::Wchar,
        IoLine::Syscr,
        IoLine::Syscw,
        IoLine::ReadBytes,
        IoLine::WriteBytes,
        IoLine::CancelledWriteBytes,
    ];

    pub fn key(self) -> &'static str {
        match self {
            IoLine::Rchar => "rchar",
            IoLine::Wchar => "wchar",
            IoLine::Syscr => "syscr",
            IoLine::Syscw => "syscw",
            IoLine::ReadBytes => "read_bytes",
            IoLine::WriteBytes => "write_bytes",
            IoLine::CancelledWriteBytes => "cancelled_write_bytes",
        }
    }
}

#[derive(Debug, Default)]
pub struct IoView {
    pub(crate) buf: ProcBuffer,
    spans: [Option<Span>; 7],
}

impl IoView {
    pub(crate) fn reparse(&mut self) {
        self.spans = [None; 7];
        for (slot, span) in self.spans.iter_mut().zip(byte_line_spans(self.buf.as_bytes())) {
            *slot = Some(span);
        }
    }

    pub fn line(&self, line: IoLine) -> Option<&str> {
        self.spans[line as usize]?.text(self.buf.as_bytes())
    }

    pub fn value(&self, line: IoLine) -> Option<u64> {
        line_value(self.line(line)?).parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IO: &str = "rchar: 323934931\n\
wchar: 323929600\n\
syscr: 632687\n\
syscw: 632675\n\
read_bytes: 4096\n\
write_bytes: 323932160\n\
cancelled_write_bytes: 0\n";

    #[test]
    fn test_io_lines_in_kernel_order() {
        let mut view = IoView::default();
        view.buf.set(IO.as_bytes()).unwrap();
        view.reparse();

        assert_eq!(view.value(IoLine::Rchar), Some(323934931));
        assert_eq!(view.value(IoLine::Syscw), Some(632675));
        assert_eq!(view.value(IoLine::ReadBytes), Some(4096));
        assert_eq!(view.line(IoLine::CancelledWriteBytes), Some("cancelled_write_bytes: 0"));
        for line in IoLine::ALL {
            assert!(view.line(line).unwrap().starts_with(line.key()));
        }
    }

    #[test]
    fn test_short_io_record() {
        let mut view = IoView::default();
        view.buf.set(b"rchar: 1\nwchar: 2\n").unwrap();
        view.reparse();
        assert_eq!(view.value(IoLine::Wchar), Some(2));
        assert_eq!(view.line(IoLine::Syscr), None);
    }
}
