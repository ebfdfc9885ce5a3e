//! On-demand download of the full resource set for offline use

use crate::error::ShellCacheResult;
use crate::manifest::Manifest;
use crate::net::{FetchOptions, Fetcher};
use crate::store::{CacheStorage, Request};
use crate::worker::{Origin, StoreNames};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Paths fetched by one offline download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineReport {
    pub fetched: Vec<String>,
}

/// Fills the content store with every manifest path it lacks
pub struct OfflinePrefetcher<'a> {
    storage: &'a dyn CacheStorage,
    fetcher: &'a dyn Fetcher,
    origin: &'a Origin,
    stores: &'a StoreNames,
    manifest: &'a Manifest,
}

impl<'a> OfflinePrefetcher<'a> {
    pub fn new(
        storage: &'a dyn CacheStorage,
        fetcher: &'a dyn Fetcher,
        origin: &'a Origin,
        stores: &'a StoreNames,
        manifest: &'a Manifest,
    ) -> Self {
        Self {
            storage,
            fetcher,
            origin,
            stores,
            manifest,
        }
    }

    /// Fetch the missing paths in one all-or-nothing batch.
    ///
    /// Cached entries are not refreshed, even when their fingerprint is stale.
    pub async fn run(&self) -> ShellCacheResult<OfflineReport> {
        let content = self.storage.open(&self.stores.content).await?;

        let present: BTreeSet<String> = content
            .keys()
            .await?
            .iter()
            .filter_map(|request| self.origin.entry_path(&request.url))
            .collect();

        let missing: Vec<String> = self
            .manifest
            .paths()
            .filter(|path| !present.contains(*path))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            debug!("Content store already holds all {} resources", self.manifest.len());
            return Ok(OfflineReport::default());
        }

        let requests: Vec<Request> = missing
            .iter()
            .map(|path| Request::get(self.origin.url_for(path)))
            .collect();
        content
            .add_all(self.fetcher, &requests, FetchOptions::default())
            .await?;

        info!("Downloaded {} resources for offline use", missing.len());
        Ok(OfflineReport { fetched: missing })
    }
}
