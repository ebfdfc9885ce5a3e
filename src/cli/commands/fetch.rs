//! Fetch command - serve one URL through the interceptor

use crate::cli::args::FetchArgs;
use crate::cli::commands::load_worker;
use crate::config::Config;
use crate::error::{ShellCacheError, ShellCacheResult};
use crate::store::Request;
use crate::ui::{self, UiContext};
use crate::worker::FetchDisposition;
use std::io::Write;
use tracing::info;

/// Execute the fetch command
///
/// Without `--output` the body goes to stdout and nothing else is printed
/// there, so the command can be piped.
pub async fn execute(args: FetchArgs, config: &Config) -> ShellCacheResult<()> {
    let ctx = UiContext::detect();
    let worker = load_worker(config).await?;

    let disposition = worker.handle_fetch(&Request::get(&args.url)).await?;
    let (response, source) = match disposition {
        FetchDisposition::Passthrough => {
            ui::step_info(
                &ctx,
                &format!("{} is not a cached resource; passthrough", args.url),
            );
            return Ok(());
        }
        FetchDisposition::Respond { response, source } => (response, source),
    };

    info!(
        "{} -> {} from {} ({} bytes)",
        args.url,
        response.status,
        source,
        response.body.len()
    );

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &response.body).await.map_err(|e| {
                ShellCacheError::io(format!("writing response to {}", path.display()), e)
            })?;
            ui::key_value_status(
                &ctx,
                "status",
                &response.status.to_string(),
                response.is_success(),
            );
            ui::key_value(&ctx, "source", &source.to_string());
            ui::key_value(
                &ctx,
                "saved",
                &format!("{} ({} bytes)", path.display(), response.body.len()),
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&response.body)
                .and_then(|()| stdout.flush())
                .map_err(|e| ShellCacheError::io("writing response to stdout", e))?;
        }
    }

    Ok(())
}
