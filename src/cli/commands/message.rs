//! Message command - post a payload to the worker

use crate::cli::args::MessageArgs;
use crate::cli::commands::load_worker;
use crate::config::Config;
use crate::error::ShellCacheResult;
use crate::ui::{self, UiContext};
use crate::worker::MessageOutcome;

/// Execute the message command
pub async fn execute(args: MessageArgs, config: &Config) -> ShellCacheResult<()> {
    let ctx = UiContext::detect();
    let worker = load_worker(config).await?;

    match worker.handle_message(&args.payload).await? {
        MessageOutcome::SkipWaiting => ui::step_ok(&ctx, "Skip waiting requested"),
        MessageOutcome::Downloaded(report) => ui::step_ok_detail(
            &ctx,
            "Offline download complete",
            &format!("{} fetched", report.fetched.len()),
        ),
        MessageOutcome::Ignored => ui::step_warn_hint(
            &ctx,
            &format!("Ignored message {:?}", args.payload),
            "Known messages: skipWaiting, downloadOffline",
        ),
    }
    Ok(())
}
