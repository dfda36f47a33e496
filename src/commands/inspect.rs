//! Inspect command implementation.
//!
//! Runs one reconciliation and prints every source for a single process.

use anyhow::{bail, Result};
use herakles_proc_cache::{
    Enumerator, Interner, IoLine, ProcError, ProcessCache, Scope, StatusLine, StringTable,
};

use crate::config::Config;

pub fn command_inspect(pid: u32, maps: bool, config: &Config) -> Result<()> {
    let root = config.proc_root();
    let mut enumerator = Enumerator::new(&root);
    let mut cache = ProcessCache::new(&root);
    let mut strings = StringTable::new();

    // Threads are only in the snapshot when asked for
    let scope = Scope {
        threads: true,
        ..config.scope()
    };
    cache.refresh(&mut enumerator, &scope)?;
    if !cache.contains(pid) {
        bail!("pid {} not found under {}", pid, root.display());
    }

    let label = cache.get(pid).map(|e| e.label().to_string()).unwrap_or_default();
    println!("🔍 {}", label);
    println!("==========================================");

    println!("\n📄 stat");
    match cache.fetch_stat(pid) {
        Ok(stat) => {
            println!("   ├─ comm:  {}", stat.comm().unwrap_or_default());
            let text = stat.text();
            let state = text
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_ascii_whitespace().next())
                .unwrap_or("?");
            println!("   ├─ state: {}", state);
            match stat.wchan() {
                Some(w) if !w.is_empty() => println!("   └─ wchan: {}", w),
                _ => println!("   └─ wchan: -"),
            }
        }
        Err(e) => print_missing(&e),
    }

    println!("\n📄 status");
    match cache.fetch_status(pid) {
        Ok(status) => {
            for line in [StatusLine::Uid, StatusLine::Gid] {
                if let Some(ids) = status.ids(line) {
                    println!("   ├─ {:<8} {:?}", line.key(), ids);
                }
            }
            if status.has_memory() {
                for line in StatusLine::MEMORY {
                    if let Some(v) = status.value(line) {
                        println!("   ├─ {:<8} {}", line.key(), v);
                    }
                }
            } else {
                println!("   ├─ no memory block (kernel thread)");
            }
            for line in StatusLine::SIGNALS {
                if let Some(mask) = status.signal_mask(line) {
                    println!("   ├─ {:<8} {:016x}", line.key(), mask);
                }
            }
        }
        Err(e) => print_missing(&e),
    }

    println!("\n📄 statm");
    match cache.fetch_statm(pid) {
        Ok(statm) => println!("   └─ {}", statm.text()),
        Err(e) => print_missing(&e),
    }

    println!("\n📄 schedstat");
    match cache.fetch_schedstat(pid) {
        Ok(sched) => println!(
            "   └─ run {} ns, wait {} ns, {} slices",
            sched.field(0),
            sched.field(1),
            sched.field(2)
        ),
        Err(e) => print_missing(&e),
    }

    println!("\n📄 io");
    match cache.fetch_io(pid) {
        Ok(io) => {
            for line in IoLine::ALL {
                if let Some(v) = io.value(line) {
                    println!("   ├─ {:<22} {}", line.key(), v);
                }
            }
        }
        Err(e) => print_missing(&e),
    }

    println!("\n📄 fd");
    match cache.fetch_fd(pid) {
        Ok(count) => println!("   └─ {} open", count),
        Err(e) => print_missing(&e),
    }

    println!("\n📄 cgroup");
    match cache.fetch_cgroup(pid, &mut strings) {
        Ok(id) => println!("   └─ {}", strings.lookup(id).unwrap_or_default()),
        Err(e) => print_missing(&e),
    }

    println!("\n📄 label");
    match cache.fetch_label(pid, &mut strings) {
        Ok(id) => println!("   └─ {}", strings.lookup(id).unwrap_or_default()),
        Err(e) => print_missing(&e),
    }

    println!("\n📄 maps");
    match cache.fetch_maps(pid) {
        Ok(view) => {
            let text = view.text();
            println!("   └─ {} mappings", text.lines().count());
            if maps {
                for line in text.lines() {
                    println!("      {}", line);
                }
            }
        }
        Err(e) => print_missing(&e),
    }

    Ok(())
}

fn print_missing(err: &ProcError) {
    if err.is_no_data() {
        println!("   └─ no data");
    } else {
        println!("   └─ ❌ {}", err);
    }
}
