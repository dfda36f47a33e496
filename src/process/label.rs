//! Display labels for newly discovered processes.
//!
//! A label is built once, when the entry is created, and never refreshed:
//! a process that later rewrites its argv keeps its original label.

use std::fs;
use std::path::Path;
use tracing::trace;

use crate::buffer::ProcBuffer;
use crate::process::Pid;

/// Upper bound on the command line bytes used for a label.
pub const CMDLINE_LABEL_LIMIT: usize = 1016;

/// Builds `"<pid> <args>"`, falling back to `"<pid> (<name>)"` and finally
/// `"<pid> <exiting>"`. The pid is zero-padded to six digits.
pub fn build_label(proc_dir: &Path, pid: Pid) -> String {
    if let Some(args) = read_cmdline(proc_dir) {
        return format!("{pid:06} {args}");
    }
    // swapped out or a kernel thread: cmdline reads back empty
    if let Some(name) = read_status_name(proc_dir) {
        return format!("{pid:06} ({name})");
    }
    trace!(pid, "no cmdline or status, labelling as exiting");
    format!("{pid:06} <exiting>")
}

/// Joins a NUL-separated argument vector with single spaces. Trailing NULs
/// are dropped; returns `None` if nothing is left.
pub fn join_cmdline(raw: &[u8]) -> Option<String> {
    let end = raw.iter().rposition(|&b| b != 0)? + 1;
    let joined: Vec<u8> = raw[..end]
        .iter()
        .map(|&b| if b == 0 { b' ' } else { b })
        .collect();
    Some(String::from_utf8_lossy(&joined).into_owned())
}

fn read_cmdline(proc_dir: &Path) -> Option<String> {
    let mut buf = ProcBuffer::new();
    buf.load_limited(&proc_dir.join("cmdline"), CMDLINE_LABEL_LIMIT)
        .ok()?;
    join_cmdline(buf.as_bytes())
}

/// `Name:` from the status record. The kernel does not escape high bytes in
/// the command name, so the value is decoded lossily.
fn read_status_name(proc_dir: &Path) -> Option<String> {
    let content = fs::read(proc_dir.join("status")).ok()?;
    let value = content
        .split(|&b| b == b'\n')
        .find_map(|line| line.strip_prefix(b"Name:"))?;
    let name = String::from_utf8_lossy(value);
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}
