//! herakles-proc-cache - version 0.1.0
//!
//! Live /proc process-table cache with tracing logging.
//! This is the main entry point that runs sampling cycles and handles subcommands.

mod cli;
mod commands;
mod config;
mod metrics;
mod sampler;
mod startup_checks;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing::{error, info};

use cli::{Args, Commands, LogLevel, OutputFormat};
use commands::{command_check, command_config, command_inspect, command_sample};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Effective log level: CLI > config file > info.
fn resolve_log_level(config: &Config, args: &Args) -> Result<LogLevel> {
    if let Some(level) = &args.log_level {
        return Ok(level.clone());
    }
    match config.log_level.as_deref() {
        Some(name) => LogLevel::from_str(name, true)
            .map_err(|e| anyhow!("Invalid log_level '{}': {}", name, e)),
        None => Ok(LogLevel::Info),
    }
}

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: &LogLevel) -> Result<()> {
    let filter = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Logging initialized with level: {:?}", level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {:#}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Main application entry point.
fn main() -> Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {:#}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, &args.config_format);
    }

    // Config generation needs no validated config
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), format.clone(), *commented);
    }

    let config = load_validated_config(&args)?;
    setup_logging(&resolve_log_level(&config, &args)?)?;

    info!("Starting herakles-proc-cache");

    match &args.command {
        Some(Commands::Check { proc, sources, all }) => {
            command_check(*proc, *sources, *all, &config)
        }
        Some(Commands::Inspect { pid, maps }) => command_inspect(*pid, *maps, &config),
        Some(Commands::Sample {
            iterations,
            format,
            metrics,
            verbose,
        }) => {
            run_startup_checks(&config);
            command_sample(*iterations, *format, *metrics, *verbose, &config)
        }
        Some(Commands::Config { .. }) => unreachable!("Config handled above"),
        None => {
            run_startup_checks(&config);
            command_sample(None, OutputFormat::Text, false, false, &config)
        }
    }
}

fn run_startup_checks(config: &Config) {
    if let Err(e) = startup_checks::validate_requirements(&config.proc_root()) {
        error!("❌ Startup validation failed: {}", e);
        error!("   Sampling will report enumeration failures until this is fixed");
    }
}
