//! CLI command implementations
//!
//! Each command builds a fresh [`ServiceWorker`] over the on-disk stores, so
//! state carries between invocations only through the stores themselves.

pub mod activate;
pub mod clear;
pub mod config;
pub mod deploy;
pub mod fetch;
pub mod install;
pub mod message;
pub mod offline;
pub mod status;

pub use activate::execute as activate;
pub use clear::execute as clear;
pub use config::execute as config;
pub use deploy::execute as deploy;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use message::execute as message;
pub use offline::execute as download_offline;
pub use status::execute as status;

use crate::audit::AuditLog;
use crate::config::{Config, ConfigManager};
use crate::error::{ShellCacheError, ShellCacheResult};
use crate::manifest::Manifest;
use crate::net::HttpFetcher;
use crate::store::DiskStorage;
use crate::worker::{ActivationOutcome, Origin, ServiceWorker, StoreNames};
use std::sync::Arc;
use tracing::debug;

/// Build a worker from the effective configuration
pub(crate) async fn load_worker(config: &Config) -> ShellCacheResult<ServiceWorker> {
    let manifest_path = config
        .app
        .manifest
        .as_deref()
        .ok_or(ShellCacheError::ManifestMissing)?;
    let manifest = Manifest::from_file(manifest_path).await?;
    let origin = Origin::parse(&config.app.origin)?;
    let root = ConfigManager::storage_root(config);

    debug!(
        "Worker for {} ({} resources, {} core), stores in {}",
        origin,
        manifest.len(),
        manifest.core().len(),
        root.display()
    );

    Ok(ServiceWorker::new(
        manifest,
        origin,
        Arc::new(DiskStorage::new(root)),
        Arc::new(HttpFetcher::new(&config.network)),
    )
    .with_stores(StoreNames::from(&config.stores))
    .with_audit(AuditLog::new(config)))
}

/// One-line summary of an activation
pub(crate) fn describe_activation(outcome: &ActivationOutcome) -> String {
    match outcome {
        ActivationOutcome::Cold { copied } => {
            format!("Cold start, cached {} core resources", copied)
        }
        ActivationOutcome::Warm {
            kept,
            evicted,
            copied,
        } => format!(
            "Kept {}, evicted {}, refreshed {} core resources",
            kept, evicted, copied
        ),
        ActivationOutcome::Reset { error } => format!("Cache reset after failure: {}", error),
    }
}
