//! Check command implementation.
//!
//! Validates system requirements and configuration.

use anyhow::Result;
use herakles_proc_cache::{Enumerator, ProcessCache, Scope, Source, StringTable};

use crate::config::{validate_effective_config, Config};

/// Validates system requirements and configuration.
pub fn command_check(proc: bool, sources: bool, all: bool, config: &Config) -> Result<()> {
    println!("🔍 Herakles Process Cache - System Check");
    println!("========================================");

    let root = config.proc_root();
    let mut all_ok = true;

    // Check the process root
    if proc || all {
        println!("\n📁 Checking {} ...", root.display());
        let mut enumerator = Enumerator::new(&root);
        match enumerator.enumerate(&Scope::all()) {
            Ok(pids) if pids.is_empty() => {
                println!("   ❌ No process directories found");
                all_ok = false;
            }
            Ok(pids) => println!("   ✅ Can enumerate {} processes", pids.len()),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }

        match enumerator.enumerate(&Scope::with_threads()) {
            Ok(ids) => println!("   ✅ Can enumerate {} processes and threads", ids.len()),
            Err(e) => println!("   ⚠️  Thread enumeration failed: {}", e),
        }

        if let Some(cgroup) = &config.cgroup {
            match enumerator.enumerate(&config.scope()) {
                Ok(pids) => println!(
                    "   ✅ Control group {} has {} members",
                    cgroup.display(),
                    pids.len()
                ),
                Err(e) => {
                    println!("   ❌ Control group {}: {}", cgroup.display(), e);
                    all_ok = false;
                }
            }
        }
    }

    // Check every source against our own process
    if sources || all {
        let pid = std::process::id();
        println!("\n💾 Checking sources for own pid {} ...", pid);

        let mut cache = ProcessCache::new(&root);
        let mut strings = StringTable::new();
        cache.reconcile(&[pid]);
        for source in Source::ALL {
            match cache.fetch(pid, source, &mut strings) {
                Ok(()) => println!("   ✅ {:<10} readable", source.name()),
                Err(e) if e.is_no_data() => {
                    // Optional on many kernels
                    let optional = matches!(source, Source::Io | Source::Label | Source::Schedstat);
                    if optional {
                        println!("   ⚠️  {:<10} not available", source.name());
                    } else {
                        println!("   ❌ {:<10} not available", source.name());
                        all_ok = false;
                    }
                }
                Err(e) => {
                    println!("   ❌ {:<10} {}", source.name(), e);
                    all_ok = false;
                }
            }
        }
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {:#}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
