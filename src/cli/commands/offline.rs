//! Download-offline command - fill the cache with every manifest resource

use crate::cli::commands::load_worker;
use crate::config::Config;
use crate::error::ShellCacheResult;
use crate::ui::{TaskSpinner, UiContext};

/// Execute the download-offline command
pub async fn execute(config: &Config) -> ShellCacheResult<()> {
    let ctx = UiContext::detect();
    let worker = load_worker(config).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Downloading missing resources...");

    match worker.download_offline().await {
        Ok(report) if report.fetched.is_empty() => {
            spinner.stop("All resources already cached");
            Ok(())
        }
        Ok(report) => {
            spinner.stop(&format!("Downloaded {} resources", report.fetched.len()));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Download failed, nothing stored");
            Err(e)
        }
    }
}
