//! CopyBench CLI - File Copy Strategy Benchmarks
//!
//! Times each configured copy strategy against one input file and prints
//! one report entry per task.

use clap::Parser;
use copybench::config::{CliArgs, HarnessConfig};
use copybench::core::{Interrupt, TaskTimer};
use copybench::error::Result;
use copybench::fs::AssetResolver;
use copybench::tasks_from_config;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging on stderr so stdout stays a clean report
    let default_level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Task failures are part of the report; only setup errors end up here
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let config = HarnessConfig::from_cli(&args)?;
    tracing::info!(
        input = %config.input_name,
        output = %config.output_name,
        strategies = config.strategies.len(),
        "Starting copy benchmark"
    );

    let tasks = tasks_from_config(&config)?;
    let resolver = AssetResolver::new(config.asset_roots.clone());

    let interrupt = Interrupt::new();
    watch_ctrl_c(&interrupt);

    let stdout = std::io::stdout();
    let mut timer = TaskTimer::new(stdout.lock(), resolver)
        .with_format(config.format)
        .with_interrupt(interrupt);
    let summary = timer.run(&tasks, config.repeat)?;

    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Benchmark complete"
    );

    Ok(())
}

/// Ctrl-C fails the in-flight task and skips the rest; a second one exits
#[cfg(unix)]
fn watch_ctrl_c(interrupt: &Interrupt) {
    use nix::sys::signal::Signal;

    if let Err(e) = interrupt.raise_on_signals(&[Signal::SIGINT, Signal::SIGTERM]) {
        tracing::warn!("Cannot watch for interrupts: {}", e);
    }
}

#[cfg(not(unix))]
fn watch_ctrl_c(_interrupt: &Interrupt) {}
