//! Prometheus self-telemetry for the refresh engine.
//!
//! These describe the cache itself (size, churn, reconcile time, fetch
//! outcomes), not the per-process values it serves.

use herakles_proc_cache::process::ReconcileStats;
use herakles_proc_cache::Source;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Outcome label values for `herakles_proc_cache_fetch_total`.
pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_NO_DATA: &str = "no_data";
pub const OUTCOME_ERROR: &str = "error";

#[derive(Clone)]
pub struct CacheMetrics {
    pub registry: Registry,
    pub entries: IntGauge,
    pub instances: IntGauge,
    pub interned_strings: IntGauge,
    pub reconcile_duration_seconds: Gauge,
    pub entries_added_total: IntCounter,
    pub entries_reaped_total: IntCounter,
    pub enumeration_failures_total: IntCounter,
    pub fetch_total: IntCounterVec, // labels: source, outcome
}

impl CacheMetrics {
    /// Creates and registers all metrics with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let entries = IntGauge::new(
            "herakles_proc_cache_entries",
            "Process entries held in the cache",
        )?;
        let instances = IntGauge::new(
            "herakles_proc_cache_instances",
            "Instances published by the last reconciliation",
        )?;
        let interned_strings = IntGauge::new(
            "herakles_proc_cache_interned_strings",
            "Distinct cgroup and label strings interned",
        )?;
        let reconcile_duration_seconds = Gauge::new(
            "herakles_proc_cache_reconcile_duration_seconds",
            "Duration of the last reconciliation in seconds",
        )?;
        let entries_added_total = IntCounter::new(
            "herakles_proc_cache_entries_added_total",
            "Entries created for newly seen processes",
        )?;
        let entries_reaped_total = IntCounter::new(
            "herakles_proc_cache_entries_reaped_total",
            "Entries removed for processes that disappeared",
        )?;
        let enumeration_failures_total = IntCounter::new(
            "herakles_proc_cache_enumeration_failures_total",
            "Cycles aborted because the process root could not be read",
        )?;
        let fetch_total = IntCounterVec::new(
            Opts::new(
                "herakles_proc_cache_fetch_total",
                "Per-source fetches by outcome",
            ),
            &["source", "outcome"],
        )?;

        registry.register(Box::new(entries.clone()))?;
        registry.register(Box::new(instances.clone()))?;
        registry.register(Box::new(interned_strings.clone()))?;
        registry.register(Box::new(reconcile_duration_seconds.clone()))?;
        registry.register(Box::new(entries_added_total.clone()))?;
        registry.register(Box::new(entries_reaped_total.clone()))?;
        registry.register(Box::new(enumeration_failures_total.clone()))?;
        registry.register(Box::new(fetch_total.clone()))?;

        Ok(Self {
            registry,
            entries,
            instances,
            interned_strings,
            reconcile_duration_seconds,
            entries_added_total,
            entries_reaped_total,
            enumeration_failures_total,
            fetch_total,
        })
    }

    pub fn observe_reconcile(&self, stats: &ReconcileStats, instances: usize) {
        self.entries.set(stats.entries as i64);
        self.instances.set(instances as i64);
        self.reconcile_duration_seconds
            .set(stats.duration.as_secs_f64());
        self.entries_added_total.inc_by(stats.added as u64);
        self.entries_reaped_total.inc_by(stats.reaped as u64);
    }

    pub fn observe_fetch(&self, source: Source, outcome: &str) {
        self.fetch_total
            .with_label_values(&[source.name(), outcome])
            .inc();
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
