//! Install command - prefetch core resources into staging

use crate::cli::commands::load_worker;
use crate::config::Config;
use crate::error::ShellCacheResult;
use crate::ui::{TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(config: &Config) -> ShellCacheResult<()> {
    let ctx = UiContext::detect();
    let worker = load_worker(config).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Prefetching {} core resources from {}...",
        worker.manifest().core().len(),
        worker.origin()
    ));

    match worker.install().await {
        Ok(report) => {
            spinner.stop(&format!("Staged {} core resources", report.fetched));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Install failed");
            Err(e)
        }
    }
}
