//! Status command - compare the cache against the manifest

use crate::cli::args::{OutputFormat, StatusArgs};
use crate::cli::commands::load_worker;
use crate::config::Config;
use crate::error::ShellCacheResult;
use crate::worker::{CacheStatus, RecordState, ServiceWorker};
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static MISSING: Emoji<'_, '_> = Emoji("○ ", "[--] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> ShellCacheResult<()> {
    let worker = load_worker(config).await?;
    let status = worker.status().await?;

    match args.format {
        OutputFormat::Table => print_table(&worker, &status),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Plain => print_plain(&status),
    }
    Ok(())
}

fn print_table(worker: &ServiceWorker, status: &CacheStatus) {
    println!("{}", style("Offline Cache Status").bold().cyan());
    println!();
    println!("  Origin:  {}", worker.origin());
    println!("  Content: {}", worker.stores().content);

    let record = match status.record {
        RecordState::Current => style("current").green(),
        RecordState::Outdated => style("outdated (activate to reconcile)").yellow(),
        RecordState::Absent => style("absent (cold start on activate)").dim(),
        RecordState::Corrupt => style("corrupt (next activation resets)").red(),
    };
    println!("  Record:  {}", record);
    println!();

    let core = worker.manifest().core();
    println!("{:<48} {:<6} {:<8}", "PATH", "CORE", "STATE");
    println!("{}", "-".repeat(64));
    for path in &status.cached {
        let is_core = core.contains(path);
        println!(
            "{:<48} {:<6} {}{}",
            path,
            if is_core { "yes" } else { "" },
            CHECK,
            style("cached").green()
        );
    }
    for path in &status.missing {
        let is_core = core.contains(path);
        println!(
            "{:<48} {:<6} {}{}",
            path,
            if is_core { "yes" } else { "" },
            MISSING,
            style("missing").dim()
        );
    }

    if !status.stray.is_empty() {
        println!();
        println!("{}", style("Stray entries:").bold());
        for url in &status.stray {
            println!("  {}{}", WARN, url);
        }
    }

    println!();
    println!(
        "Total: {} cached, {} missing, {} stray",
        status.cached.len(),
        status.missing.len(),
        status.stray.len()
    );
}

fn print_plain(status: &CacheStatus) {
    for path in &status.cached {
        println!("cached {}", path);
    }
    for path in &status.missing {
        println!("missing {}", path);
    }
    for url in &status.stray {
        println!("stray {}", url);
    }
}
