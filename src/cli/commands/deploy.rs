//! Deploy command - install then activate

use crate::cli::commands::{activate, load_worker};
use crate::config::Config;
use crate::error::ShellCacheResult;
use crate::ui::{self, TaskSpinner, UiContext};
use crate::worker::ActivationOutcome;

/// Execute the deploy command
pub async fn execute(config: &Config) -> ShellCacheResult<()> {
    let ctx = UiContext::detect();
    let worker = load_worker(config).await?;

    ui::intro(&ctx, &format!("Deploying {}", worker.origin()));

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Prefetching core resources...");
    let report = match worker.install().await {
        Ok(report) => report,
        Err(e) => {
            spinner.stop_error("Install failed, cache left unchanged");
            return Err(e);
        }
    };
    spinner.stop(&format!("Staged {} core resources", report.fetched));

    let outcome = worker.activate().await?;
    activate::report(&ctx, &outcome);

    if !matches!(outcome, ActivationOutcome::Reset { .. }) {
        ui::outro_success(
            &ctx,
            &format!("{} resources tracked", worker.manifest().len()),
        );
    }
    Ok(())
}
