//! Activate command - reconcile the content store

use crate::cli::commands::{describe_activation, load_worker};
use crate::config::Config;
use crate::error::ShellCacheResult;
use crate::ui::{self, UiContext};
use crate::worker::ActivationOutcome;

/// Execute the activate command
pub async fn execute(config: &Config) -> ShellCacheResult<()> {
    let ctx = UiContext::detect();
    let worker = load_worker(config).await?;

    let outcome = worker.activate().await?;
    report(&ctx, &outcome);
    Ok(())
}

/// Print an activation outcome
pub(crate) fn report(ctx: &UiContext, outcome: &ActivationOutcome) {
    match outcome {
        ActivationOutcome::Reset { .. } => ui::step_warn_hint(
            ctx,
            &describe_activation(outcome),
            "Run: shellcache deploy",
        ),
        _ => ui::step_ok_detail(ctx, "Activated", &describe_activation(outcome)),
    }
}
