//! Configuration management for herakles-proc-cache.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use anyhow::{bail, Context, Result};
use herakles_proc_cache::{Scope, Source};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_ITERATIONS: usize = 1;

/// Effective configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Discovery
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    pub threads: Option<bool>,
    pub cgroup: Option<PathBuf>,

    // Sampling
    #[serde(alias = "interval-ms")]
    pub interval_ms: Option<u64>,
    pub iterations: Option<usize>,
    /// Source names fetched for every instance each cycle
    pub sources: Option<Vec<String>>,

    // Feature flags
    #[serde(alias = "enable-telemetry")]
    pub enable_telemetry: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            threads: Some(false),
            cgroup: None,
            interval_ms: Some(DEFAULT_INTERVAL_MS),
            iterations: Some(DEFAULT_ITERATIONS),
            sources: Some(Source::ALL.iter().map(|s| s.name().to_string()).collect()),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    pub fn scope(&self) -> Scope {
        Scope {
            threads: self.threads.unwrap_or(false),
            cgroup: self.cgroup.clone(),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS)
    }

    pub fn iterations(&self) -> usize {
        self.iterations.unwrap_or(DEFAULT_ITERATIONS)
    }

    /// Parsed source list; all sources when unset.
    pub fn sources(&self) -> Result<Vec<Source>> {
        match &self.sources {
            None => Ok(Source::ALL.to_vec()),
            Some(names) => names
                .iter()
                .map(|n| n.trim().parse::<Source>().map_err(Into::into))
                .collect(),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if cfg.proc_root().as_os_str().is_empty() {
        bail!("proc_root must not be empty");
    }

    if cfg.interval_ms() == 0 {
        bail!("interval_ms must be greater than 0");
    }

    if cfg.iterations() == 0 {
        bail!("iterations must be greater than 0");
    }

    if let Some(cgroup) = &cfg.cgroup {
        if cgroup.as_os_str().is_empty() {
            bail!("cgroup is set but empty; remove it to sample all processes");
        }
    }

    cfg.sources().context("Invalid sources list")?;

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if args.threads {
        config.threads = Some(true);
    }
    if let Some(cgroup) = &args.cgroup {
        config.cgroup = Some(cgroup.clone());
    }
    if let Some(interval) = args.interval_ms {
        config.interval_ms = Some(interval);
    }

    // Parse comma-separated source names
    if let Some(sources) = &args.sources {
        config.sources = Some(
            sources
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        );
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            // Try default locations
            let defaults = [
                "/etc/herakles/proc-cache.yaml",
                "/etc/herakles/proc-cache.yml",
                "/etc/herakles/proc-cache.json",
                "./herakles-proc-cache.yaml",
                "./herakles-proc-cache.yml",
                "./herakles-proc-cache.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Renders configuration in the requested format
pub fn render_config(config: &Config, format: &ConfigFormat) -> Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.sources().unwrap(), Source::ALL.to_vec());
        assert_eq!(cfg.scope(), Scope::all());
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let cfg = Config {
            sources: Some(vec!["stat".into(), "smaps".into()]),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let cfg = Config {
            interval_ms: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_empty_cgroup_is_rejected() {
        let cfg = Config {
            cgroup: Some(PathBuf::new()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_load_yaml_with_aliases() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("cfg.yaml");
        std::fs::write(
            &path,
            "proc-root: /host/proc\nthreads: true\ninterval-ms: 250\nsources: [stat, io]\n",
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.proc_root(), PathBuf::from("/host/proc"));
        assert!(cfg.scope().threads);
        assert_eq!(cfg.interval_ms(), 250);
        assert_eq!(cfg.sources().unwrap(), vec![Source::Stat, Source::Io]);
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempdir().expect("Failed to create temp dir");

        let json = dir.path().join("cfg.json");
        std::fs::write(&json, r#"{"cgroup": "/sys/fs/cgroup/system.slice"}"#).unwrap();
        let cfg = load_config(Some(&json)).unwrap();
        assert_eq!(
            cfg.scope().cgroup,
            Some(PathBuf::from("/sys/fs/cgroup/system.slice"))
        );

        let toml_path = dir.path().join("cfg.toml");
        std::fs::write(&toml_path, "iterations = 5\n").unwrap();
        let cfg = load_config(Some(&toml_path)).unwrap();
        assert_eq!(cfg.iterations(), 5);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let cfg = load_config(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(cfg.proc_root(), PathBuf::from(DEFAULT_PROC_ROOT));
    }
}
