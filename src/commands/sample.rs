//! Sample command implementation.
//!
//! Runs reconciliation cycles and reports what the cache fetched.

use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::metrics::CacheMetrics;
use crate::sampler::{CycleReport, Sampler};

/// Runs `iterations` sampling cycles.
pub fn command_sample(
    iterations: Option<usize>,
    format: OutputFormat,
    metrics: bool,
    verbose: bool,
    config: &Config,
) -> Result<()> {
    let iterations = iterations.unwrap_or_else(|| config.iterations());
    let telemetry = if metrics || config.enable_telemetry.unwrap_or(true) {
        Some(CacheMetrics::new().context("Failed to register self-telemetry")?)
    } else {
        None
    };
    let mut sampler = Sampler::new(config, telemetry)?;
    let interval = Duration::from_millis(config.interval_ms());

    if format == OutputFormat::Text {
        println!("🧪 Herakles Process Cache - Sample Mode");
        println!("=======================================");
    }

    for iteration in 1..=iterations {
        let report = sampler
            .cycle()
            .with_context(|| format!("Cycle {} failed", iteration))?;

        match format {
            OutputFormat::Text => print_text(iteration, iterations, &report, verbose),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        }

        if iteration < iterations {
            thread::sleep(interval);
        }
    }

    if metrics {
        if let Some(m) = sampler.metrics() {
            println!("{}", m.render()?);
        }
    }

    if format == OutputFormat::Text {
        println!("\n✅ Sampling completed successfully");
    }
    Ok(())
}

fn print_text(iteration: usize, iterations: usize, report: &CycleReport, verbose: bool) {
    println!("\n🔄 Iteration {}/{}:", iteration, iterations);
    println!(
        "   📁 {} instances (+{} new, -{} exited)",
        report.instances, report.added, report.reaped
    );
    println!("   ⏱️  Reconcile: {:.2}ms", report.reconcile_ms);
    println!("   ⏱️  Cycle: {:.2}ms", report.cycle_ms);

    if !report.outcomes.is_empty() {
        println!("   📊 Sources (fetched / no data):");
        let last = report.outcomes.len() - 1;
        for (i, (source, (ok, missing))) in report.outcomes.iter().enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            println!("      {} {:<10} {:>6} / {}", branch, source, ok, missing);
        }
    }

    if verbose {
        for sample in &report.samples {
            println!("   ├─ {}", sample.label);
            if let (Some(state), Some(ppid)) = (&sample.state, sample.ppid) {
                println!("   │  ├─ State: {} (parent {})", state, ppid);
            }
            if let Some(rss) = sample.vm_rss_kb {
                println!("   │  ├─ RSS: {} kB", rss);
            }
            if let Some(fds) = sample.fd_count {
                println!("   │  ├─ Open fds: {}", fds);
            }
            if let Some(cgroup) = &sample.cgroup {
                println!("   │  ├─ Cgroup: {}", cgroup);
            }
            if !sample.missing.is_empty() {
                let names: Vec<&str> = sample.missing.iter().map(|s| s.name()).collect();
                println!("   │  └─ No data: {}", names.join(", "));
            }
        }
    }
}
