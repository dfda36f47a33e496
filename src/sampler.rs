//! Sampling cycle driver.
//!
//! Owns the enumerator, the process cache and the string table, runs one
//! reconciliation per cycle and pulls the configured sources for every
//! published instance, the way a metrics framework would.

use anyhow::Result;
use chrono::{DateTime, Utc};
use herakles_proc_cache::process::ReconcileStats;
use herakles_proc_cache::{
    Enumerator, Interner, IoLine, Pid, ProcError, ProcessCache, Scope, Source, StatusLine,
    StringTable,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::metrics::{CacheMetrics, OUTCOME_ERROR, OUTCOME_NO_DATA, OUTCOME_OK};

/// Flattened view of one process for printing and serialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessSample {
    pub pid: Pid,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppid: Option<Pid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wchan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_size_kb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_rss_kb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_swap_kb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statm_resident_pages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_time_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fd_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cgroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_label: Option<String>,
    /// Sources that had no data this cycle.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<Source>,
}

/// Result of one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub sampled_at: DateTime<Utc>,
    pub instances: usize,
    pub added: usize,
    pub reaped: usize,
    pub reconcile_ms: f64,
    pub cycle_ms: f64,
    /// Per source: (fetched, no data)
    pub outcomes: BTreeMap<String, (usize, usize)>,
    pub samples: Vec<ProcessSample>,
}

pub struct Sampler {
    enumerator: Enumerator,
    cache: ProcessCache,
    strings: StringTable,
    scope: Scope,
    sources: Vec<Source>,
    metrics: Option<CacheMetrics>,
}

impl Sampler {
    pub fn new(config: &Config, metrics: Option<CacheMetrics>) -> Result<Self> {
        let root = config.proc_root();
        Ok(Self {
            enumerator: Enumerator::new(&root),
            cache: ProcessCache::new(&root),
            strings: StringTable::new(),
            scope: config.scope(),
            sources: config.sources()?,
            metrics,
        })
    }

    pub fn cache(&self) -> &ProcessCache {
        &self.cache
    }

    pub fn metrics(&self) -> Option<&CacheMetrics> {
        self.metrics.as_ref()
    }

    /// Enumerates, reconciles and samples every instance.
    #[instrument(skip_all)]
    pub fn cycle(&mut self) -> Result<CycleReport, ProcError> {
        let start = Instant::now();
        let sampled_at = Utc::now();

        if let Err(e) = self.cache.refresh(&mut self.enumerator, &self.scope) {
            if let Some(m) = &self.metrics {
                m.enumeration_failures_total.inc();
            }
            warn!("Enumeration failed, keeping previous cache: {}", e);
            return Err(e);
        }
        let stats: ReconcileStats = self.cache.last_reconcile();
        if let Some(m) = &self.metrics {
            m.observe_reconcile(&stats, self.cache.instances().len());
        }

        let instances: Vec<(Pid, String)> = self
            .cache
            .instances()
            .iter()
            .map(|i| (i.pid, i.label.to_string()))
            .collect();

        let mut outcomes: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        let mut samples = Vec::with_capacity(instances.len());
        for (pid, label) in instances {
            let sample = self.sample(pid, label);
            for source in &self.sources {
                let slot = outcomes.entry(source.name().to_string()).or_default();
                if sample.missing.contains(source) {
                    slot.1 += 1;
                } else {
                    slot.0 += 1;
                }
            }
            samples.push(sample);
        }

        if let Some(m) = &self.metrics {
            m.interned_strings.set(self.strings.len() as i64);
        }

        let report = CycleReport {
            sampled_at,
            instances: samples.len(),
            added: stats.added,
            reaped: stats.reaped,
            reconcile_ms: stats.duration.as_secs_f64() * 1000.0,
            cycle_ms: start.elapsed().as_secs_f64() * 1000.0,
            outcomes,
            samples,
        };
        info!(
            "Cycle complete: {} instances (+{} / -{}) in {:.2}ms",
            report.instances, report.added, report.reaped, report.cycle_ms
        );
        Ok(report)
    }

    /// Fetches the configured sources for one pid. Failures never abort the
    /// cycle; the source is recorded as missing.
    pub fn sample(&mut self, pid: Pid, label: String) -> ProcessSample {
        let mut sample = ProcessSample {
            pid,
            label,
            ..ProcessSample::default()
        };

        for source in self.sources.clone() {
            let result = self.fill(&mut sample, source);
            let outcome = settle(&mut sample, source, result);
            self.observe(source, outcome);
        }
        sample
    }

    fn observe(&self, source: Source, outcome: &str) {
        if let Some(m) = &self.metrics {
            m.observe_fetch(source, outcome);
        }
    }

    fn fill(&mut self, sample: &mut ProcessSample, source: Source) -> Result<(), ProcError> {
        let pid = sample.pid;
        match source {
            Source::Stat => {
                let stat = self.cache.fetch_stat(pid)?;
                sample.comm = stat.comm();
                // fields after the command name, which may contain spaces
                if let Some(rest) = stat.text().rsplit_once(')').map(|(_, r)| r.to_string()) {
                    let mut fields = rest.split_ascii_whitespace();
                    sample.state = fields.next().map(str::to_owned);
                    sample.ppid = fields.next().and_then(|p| p.parse().ok());
                }
                sample.wchan = stat.wchan().map(|w| w.into_owned());
            }
            Source::Status => {
                let status = self.cache.fetch_status(pid)?;
                sample.uid = status.ids(StatusLine::Uid).map(|ids| ids[0]);
                sample.gid = status.ids(StatusLine::Gid).map(|ids| ids[0]);
                sample.vm_size_kb = status.number(StatusLine::VmSize);
                sample.vm_rss_kb = status.number(StatusLine::VmRss);
                sample.vm_swap_kb = status.number(StatusLine::VmSwap);
                sample.threads = status.number(StatusLine::Threads);
            }
            Source::Statm => {
                sample.statm_resident_pages = self.cache.fetch_statm(pid)?.parse_field(1);
            }
            Source::Schedstat => {
                sample.run_time_ns = self.cache.fetch_schedstat(pid)?.parse_field(0);
            }
            Source::Maps => {
                let maps = self.cache.fetch_maps(pid)?;
                sample.map_count = Some(maps.text().lines().filter(|l| !l.is_empty()).count());
            }
            Source::Io => {
                let io = self.cache.fetch_io(pid)?;
                sample.read_bytes = io.value(IoLine::ReadBytes);
                sample.write_bytes = io.value(IoLine::WriteBytes);
            }
            Source::Fd => {
                sample.fd_count = Some(self.cache.fetch_fd(pid)?);
            }
            Source::Cgroup => {
                let id = self.cache.fetch_cgroup(pid, &mut self.strings)?;
                sample.cgroup = self.strings.lookup(id).map(str::to_owned);
            }
            Source::Label => {
                let id = self.cache.fetch_label(pid, &mut self.strings)?;
                sample.security_label = self.strings.lookup(id).map(str::to_owned);
            }
        }
        Ok(())
    }
}

/// Maps one fetch result to its telemetry outcome, recording missing sources.
/// An allocation failure only costs this source for this pid.
fn settle(sample: &mut ProcessSample, source: Source, result: Result<(), ProcError>) -> &'static str {
    match result {
        Ok(()) => OUTCOME_OK,
        Err(e) if e.is_no_data() => {
            sample.missing.push(source);
            OUTCOME_NO_DATA
        }
        Err(e @ ProcError::NotCached(_)) => {
            debug!("{}", e);
            sample.missing.push(source);
            OUTCOME_NO_DATA
        }
        Err(e) => {
            warn!(pid = sample.pid, %source, error = %e, "fetch failed");
            sample.missing.push(source);
            OUTCOME_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cycle_samples_and_records_missing_sources() {
        let root = tempdir().expect("Failed to create temp dir");
        let dir = root.path().join("42");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("cmdline"), "sleep\0infinity\0").unwrap();
        fs::write(dir.join("stat"), "42 (sleep) S 1 42 42 0 -1\n").unwrap();
        fs::write(dir.join("status"), "Name:\tsleep\nUid:\t1000\t1000\t1000\t1000\n").unwrap();

        let config = Config {
            proc_root: Some(root.path().to_path_buf()),
            sources: Some(vec!["stat".into(), "status".into(), "io".into()]),
            ..Config::default()
        };
        let metrics = CacheMetrics::new().unwrap();
        let mut sampler = Sampler::new(&config, Some(metrics)).unwrap();

        let report = sampler.cycle().unwrap();
        assert_eq!(report.instances, 1);
        assert_eq!(report.added, 1);

        let sample = &report.samples[0];
        assert_eq!(sample.label, "000042 sleep infinity");
        assert_eq!(sample.comm.as_deref(), Some("sleep"));
        assert_eq!(sample.state.as_deref(), Some("S"));
        assert_eq!(sample.ppid, Some(1));
        assert_eq!(sample.uid, Some(1000));
        assert_eq!(sample.vm_rss_kb, None);
        assert_eq!(sample.missing, vec![Source::Io]);
        assert_eq!(report.outcomes.get("io"), Some(&(0, 1)));

        let text = sampler.metrics().unwrap().render().unwrap();
        assert!(text.contains("herakles_proc_cache_entries 1"));
        assert!(text.lines().any(|l| l.starts_with("herakles_proc_cache_fetch_total")
            && l.contains(r#"source="io""#)
            && l.contains(r#"outcome="no_data""#)
            && l.ends_with(" 1")));
    }

    #[test]
    fn test_alloc_failure_only_marks_that_source() {
        let mut sample = ProcessSample {
            pid: 7,
            ..ProcessSample::default()
        };
        let source = Vec::<u8>::new().try_reserve_exact(usize::MAX).unwrap_err();
        let err = ProcError::Alloc {
            requested: usize::MAX,
            source,
        };

        assert_eq!(settle(&mut sample, Source::Maps, Err(err)), OUTCOME_ERROR);
        assert_eq!(settle(&mut sample, Source::Stat, Ok(())), OUTCOME_OK);
        let no_data = ProcError::NoData {
            pid: 7,
            kind: Source::Io,
        };
        assert_eq!(settle(&mut sample, Source::Io, Err(no_data)), OUTCOME_NO_DATA);
        assert_eq!(sample.missing, vec![Source::Maps, Source::Io]);
    }

    #[test]
    fn test_cycle_fails_on_missing_root() {
        let root = tempdir().expect("Failed to create temp dir");
        let config = Config {
            proc_root: Some(root.path().join("absent")),
            ..Config::default()
        };
        let mut sampler = Sampler::new(&config, Some(CacheMetrics::new().unwrap())).unwrap();
        assert!(sampler.cycle().is_err());
        assert!(sampler.cache().is_empty());
        let text = sampler.metrics().unwrap().render().unwrap();
        assert!(text.contains("herakles_proc_cache_enumeration_failures_total 1"));
    }
}
