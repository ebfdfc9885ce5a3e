//! Clear command - delete every store the worker owns

use crate::cli::args::ClearArgs;
use crate::config::{Config, ConfigManager};
use crate::error::ShellCacheResult;
use crate::store::{CacheStorage, DiskStorage};
use crate::ui::{self, UiContext};
use crate::worker::{teardown, StoreNames};

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> ShellCacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let storage = DiskStorage::new(ConfigManager::storage_root(config));
    let stores = StoreNames::from(&config.stores);

    let owned = [&stores.content, &stores.staging, &stores.manifest];
    let existing: Vec<String> = storage
        .names()
        .await?
        .into_iter()
        .filter(|name| owned.contains(&name))
        .collect();

    if existing.is_empty() {
        ui::step_info(&ctx, "Nothing to clear");
        return Ok(());
    }

    let prompt = format!("Delete {}?", existing.join(", "));
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Not cleared", "Pass --yes to skip the prompt");
        return Ok(());
    }

    teardown(&storage, &stores).await?;
    ui::step_ok_detail(
        &ctx,
        "Cache cleared",
        &storage.root().display().to_string(),
    );
    Ok(())
}
