//! Startup requirement validation for herakles-proc-cache.
//!
//! This module validates that the process root is readable and warns when
//! the cache will only see part of the process table.

use nix::unistd::geteuid;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    check_proc_root(proc_root)?;
    check_init_access(proc_root);

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - io, fd and maps of other users' processes will have no data");
        warn!("   Recommendation: Run as root or grant cap_dac_read_search,cap_sys_ptrace");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

/// The process root must be a listable directory; every cycle depends on it.
fn check_proc_root(proc_root: &Path) -> Result<(), ValidationError> {
    match fs::read_dir(proc_root) {
        Ok(_) => {
            info!("✅ {} is readable", proc_root.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            error!("❌ {} not found", proc_root.display());
            error!("   Solution: mount -t proc proc {}", proc_root.display());
            Err(ValidationError::ProcRootMissing(
                proc_root.display().to_string(),
            ))
        }
        Err(e) => {
            error!("❌ Cannot list {}: {}", proc_root.display(), e);
            Err(ValidationError::ProcRootUnreadable(e.to_string()))
        }
    }
}

/// Read from a root-owned process to see whether restricted sources will work.
fn check_init_access(proc_root: &Path) {
    let test_file = proc_root.join("1").join("io");
    match fs::File::open(&test_file) {
        Ok(_) => debug!("✅ {} readable", test_file.display()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            warn!(
                "⚠️  Cannot read {} - restricted sources of foreign processes will report no data",
                test_file.display()
            );
        }
        Err(e) => debug!("Could not read {}: {}", test_file.display(), e),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Process root not found: {0}")]
    ProcRootMissing(String),

    #[error("Process root not readable: {0}")]
    ProcRootUnreadable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_proc_root_fails() {
        let dir = tempdir().expect("Failed to create temp dir");
        let result = validate_requirements(&dir.path().join("absent"));
        assert!(matches!(result, Err(ValidationError::ProcRootMissing(_))));
    }

    #[test]
    fn test_empty_proc_root_passes() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert!(validate_requirements(dir.path()).is_ok());
    }
}
