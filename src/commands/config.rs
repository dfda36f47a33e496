//! Config command implementation.
//!
//! Generates configuration files in various formats.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat, commented: bool) -> Result<()> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("herakles-proc-cache.yaml"),
    };

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Process Cache Configuration
# ====================================
#
# Discovery
# ---------
# proc_root: "/proc"           # Process root to enumerate and read
# threads: false               # Publish threads as separate instances
# cgroup: null                 # Restrict to members of this control-group directory
#                              # e.g. "/sys/fs/cgroup/system.slice/nginx.service"
#
# Sampling
# --------
# interval_ms: 1000            # Pause between cycles
# iterations: 1                # Cycles run by `sample`
# sources:                     # Sources fetched for every instance each cycle
#   - stat                     # stat record plus wchan
#   - status                   # credentials, memory summary, signal masks
#   - statm
#   - schedstat
#   - maps                     # can be large
#   - io                       # needs task I/O accounting and privileges
#   - fd                       # open descriptor count
#   - cgroup
#   - label                    # security context (attr/current)
#
# Feature Flags
# -------------
# enable_telemetry: true       # Keep Prometheus self-telemetry
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
