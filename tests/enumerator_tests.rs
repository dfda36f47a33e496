//! Integration tests for process enumeration.
//!
//! These tests verify global, thread-inclusive and cgroup-scoped pid
//! discovery against a fake process root, and that an enumeration failure
//! leaves the cache untouched.

use herakles_proc_cache::{Enumerator, ProcError, ProcessCache, Scope};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn mkdirs(root: &Path, names: &[&str]) {
    for name in names {
        fs::create_dir_all(root.join(name)).unwrap();
    }
}

// ============================================================================
// Global enumeration
// ============================================================================

#[test]
fn test_global_snapshot_is_ascending_and_numeric_only() {
    let root = tempdir().expect("Failed to create temp dir");
    mkdirs(root.path(), &["300", "20", "1", "self", "sys", "4096"]);

    let mut en = Enumerator::new(root.path());
    let pids = en.enumerate(&Scope::all()).unwrap().to_vec();
    assert_eq!(pids, vec![1, 20, 300, 4096]);
    assert_eq!(en.snapshot(), &pids[..]);
}

#[test]
fn test_threads_are_added_when_requested() {
    let root = tempdir().expect("Failed to create temp dir");
    mkdirs(
        root.path(),
        &["100/task/100", "100/task/101", "100/task/102", "100/task/103", "7"],
    );

    let mut en = Enumerator::new(root.path());
    assert_eq!(en.enumerate(&Scope::all()).unwrap(), &[7, 100]);
    assert_eq!(
        en.enumerate(&Scope::with_threads()).unwrap(),
        &[7, 100, 101, 102, 103]
    );
}

#[test]
fn test_threads_are_cached_independently() {
    let root = tempdir().expect("Failed to create temp dir");
    mkdirs(root.path(), &["100/task/100", "100/task/101", "100/task/102"]);
    fs::write(root.path().join("100/stat"), "100 (leader) S 1 100\n").unwrap();
    // the kernel serves /proc/<tid> for threads too
    fs::create_dir_all(root.path().join("101")).unwrap();
    fs::write(root.path().join("101/stat"), "101 (worker) R 1 100\n").unwrap();

    let mut en = Enumerator::new(root.path());
    let mut cache = ProcessCache::new(root.path());
    assert_eq!(cache.refresh(&mut en, &Scope::with_threads()).unwrap(), 3);
    let pids: Vec<u32> = cache.instances().iter().map(|i| i.pid).collect();
    assert_eq!(pids, vec![100, 101, 102]);

    assert_eq!(cache.fetch_stat(101).unwrap().comm().as_deref(), Some("worker"));
    assert_eq!(cache.fetch_stat(100).unwrap().comm().as_deref(), Some("leader"));
    assert!(cache.fetch_stat(102).unwrap_err().is_no_data());
    assert_eq!(cache.fetch_stat(101).unwrap().field(2), "R");
}

#[test]
fn test_missing_root_fails_and_cache_is_kept() {
    let root = tempdir().expect("Failed to create temp dir");
    let mut cache = ProcessCache::new(root.path());
    cache.reconcile(&[1, 2]);

    let mut en = Enumerator::new(root.path().join("gone"));
    let err = cache.refresh(&mut en, &Scope::all()).unwrap_err();
    assert!(matches!(err, ProcError::Enumerate { .. }));
    assert!(err.raw_os_error().is_some());
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.instances().len(), 2);
}

#[test]
fn test_refresh_reconciles_the_snapshot() {
    let root = tempdir().expect("Failed to create temp dir");
    mkdirs(root.path(), &["10", "11"]);

    let mut en = Enumerator::new(root.path());
    let mut cache = ProcessCache::new(root.path());
    assert_eq!(cache.refresh(&mut en, &Scope::all()).unwrap(), 2);

    fs::remove_dir(root.path().join("10")).unwrap();
    mkdirs(root.path(), &["12"]);
    assert_eq!(cache.refresh(&mut en, &Scope::all()).unwrap(), 2);
    let pids: Vec<u32> = cache.instances().iter().map(|i| i.pid).collect();
    assert_eq!(pids, vec![11, 12]);
}

// ============================================================================
// Cgroup-scoped enumeration
// ============================================================================

#[test]
fn test_cgroup_members_are_sorted() {
    let root = tempdir().expect("Failed to create temp dir");
    let group = root.path().join("system.slice/nginx.service");
    fs::create_dir_all(&group).unwrap();
    fs::write(group.join("cgroup.procs"), "30\n10\n20\n").unwrap();
    fs::write(group.join("tasks"), "10\n11\n20\n30\n31\n").unwrap();

    let mut en = Enumerator::new(root.path());
    assert_eq!(en.enumerate(&Scope::cgroup(&group, false)).unwrap(), &[10, 20, 30]);
    assert_eq!(
        en.enumerate(&Scope::cgroup(&group, true)).unwrap(),
        &[10, 11, 20, 30, 31]
    );
}

#[test]
fn test_missing_membership_file_is_empty_snapshot() {
    let root = tempdir().expect("Failed to create temp dir");
    let mut en = Enumerator::new(root.path());
    let pids = en
        .enumerate(&Scope::cgroup(root.path().join("no/such/group"), false))
        .unwrap();
    assert!(pids.is_empty());
}

#[test]
fn test_cgroup_scope_ignores_malformed_lines() {
    let root = tempdir().expect("Failed to create temp dir");
    fs::write(root.path().join("cgroup.procs"), "5\n\nabc\n3\n").unwrap();

    let mut en = Enumerator::new(root.path());
    assert_eq!(en.enumerate(&Scope::cgroup(root.path(), false)).unwrap(), &[3, 5]);
}
