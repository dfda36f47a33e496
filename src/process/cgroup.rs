//! Control-group membership formatting.
//!
//! `/proc/<pid>/cgroup` lists one `index:subsystems:path` line per hierarchy.
//! Process-listing tools show the set on one line as
//! `subsystems:path;subsystems:path`, which is the form that gets interned.

/// Converts raw cgroup lines into the one-line `;`-joined form.
pub fn reformat_cgroup(raw: &str) -> String {
    let raw = raw.split('\0').next().unwrap_or("");
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        let Some((_, rest)) = line.split_once(':') else {
            continue;
        };
        if !out.is_empty() {
            out.push(';');
        }
        out.push_str(rest);
    }
    out
}
