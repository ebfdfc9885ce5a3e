//! Activation-time reconciliation of the content store
//!
//! Runs once per activation, and only over a staging store that holds a
//! completed install of the same manifest. Otherwise activation is refused
//! with no store touched.
//!
//! 1. No persisted record: drop the content store and start it from staging.
//! 2. Otherwise evict every content entry whose path is gone from the new
//!    manifest or whose fingerprint changed since the record.
//! 3. Copy staging into content, overwriting preserved entries.
//! 4. Delete staging.
//! 5. Persist the new manifest as the record.
//!
//! Any error in these steps tears down all three stores. A half-updated
//! cache could serve a mix of two deploys; an empty one only costs a refetch.

use crate::error::{ShellCacheError, ShellCacheResult};
use crate::manifest::{Manifest, ManifestRecord, RECORD_KEY};
use crate::store::{CacheStorage, CacheStore, Request};
use crate::worker::install::{is_marker, is_staged_for};
use crate::worker::{Origin, StoreNames};
use tracing::{debug, error, info};

/// What an activation did to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No prior record; content rebuilt from staging
    Cold { copied: usize },
    /// Prior record found; unchanged entries reused
    Warm {
        kept: usize,
        evicted: usize,
        copied: usize,
    },
    /// Reconciliation failed and every store was deleted
    Reset { error: String },
}

/// Diffs the new manifest against the persisted record
pub struct Reconciler<'a> {
    storage: &'a dyn CacheStorage,
    origin: &'a Origin,
    stores: &'a StoreNames,
    manifest: &'a Manifest,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        storage: &'a dyn CacheStorage,
        origin: &'a Origin,
        stores: &'a StoreNames,
        manifest: &'a Manifest,
    ) -> Self {
        Self {
            storage,
            origin,
            stores,
            manifest,
        }
    }

    /// Reconcile, falling back to a full teardown on failure.
    ///
    /// Returns [`ShellCacheError::NotStaged`] before touching any store when
    /// staging does not hold an install of this manifest. Otherwise returns
    /// `Err` only when the teardown itself fails.
    pub async fn run(&self) -> ShellCacheResult<ActivationOutcome> {
        if !is_staged_for(self.storage, self.stores, self.manifest).await? {
            return Err(ShellCacheError::NotStaged(self.stores.staging.clone()));
        }

        match self.reconcile().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Failed to upgrade cache, clearing all stores: {}", e);
                teardown(self.storage, self.stores).await?;
                Ok(ActivationOutcome::Reset {
                    error: e.to_string(),
                })
            }
        }
    }

    async fn reconcile(&self) -> ShellCacheResult<ActivationOutcome> {
        let mut content = self.storage.open(&self.stores.content).await?;
        let staging = self.storage.open(&self.stores.staging).await?;
        let manifest_store = self.storage.open(&self.stores.manifest).await?;

        let outcome = match self.load_record(manifest_store.as_ref()).await? {
            None => {
                debug!("No persisted manifest, rebuilding {}", self.stores.content);
                self.storage.delete(&self.stores.content).await?;
                content = self.storage.open(&self.stores.content).await?;

                let copied = copy_entries(staging.as_ref(), content.as_ref()).await?;
                info!("Cold start: cached {} core resources", copied);
                ActivationOutcome::Cold { copied }
            }
            Some(previous) => {
                let (kept, evicted) = self.evict_stale(content.as_ref(), &previous).await?;
                let copied = copy_entries(staging.as_ref(), content.as_ref()).await?;
                info!(
                    "Upgrade: kept {}, evicted {}, refreshed {} core resources",
                    kept, evicted, copied
                );
                ActivationOutcome::Warm {
                    kept,
                    evicted,
                    copied,
                }
            }
        };

        self.storage.delete(&self.stores.staging).await?;
        manifest_store
            .put(&self.record_request(), &self.manifest.record().to_response()?)
            .await?;

        Ok(outcome)
    }

    fn record_request(&self) -> Request {
        Request::get(self.origin.url_for(RECORD_KEY))
    }

    async fn load_record(&self, store: &dyn CacheStore) -> ShellCacheResult<Option<ManifestRecord>> {
        match store.match_request(&self.record_request()).await? {
            Some(response) => ManifestRecord::from_response(&response).map(Some),
            None => Ok(None),
        }
    }

    /// Delete entries that are gone or changed; returns (kept, evicted)
    async fn evict_stale(
        &self,
        content: &dyn CacheStore,
        previous: &ManifestRecord,
    ) -> ShellCacheResult<(usize, usize)> {
        let mut kept = 0;
        let mut evicted = 0;

        for request in content.keys().await? {
            let unchanged = self
                .origin
                .entry_path(&request.url)
                .is_some_and(|path| self.manifest.is_unchanged_since(previous, &path));

            if unchanged {
                kept += 1;
            } else {
                debug!("Evicting stale entry {}", request.url);
                content.delete(&request).await?;
                evicted += 1;
            }
        }

        Ok((kept, evicted))
    }
}

async fn copy_entries(from: &dyn CacheStore, to: &dyn CacheStore) -> ShellCacheResult<usize> {
    let mut copied = 0;
    for request in from.keys().await?.into_iter().filter(|r| !is_marker(r)) {
        if let Some(response) = from.match_request(&request).await? {
            to.put(&request, &response).await?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Delete the content, staging and manifest stores
pub async fn teardown(storage: &dyn CacheStorage, stores: &StoreNames) -> ShellCacheResult<()> {
    for name in [&stores.content, &stores.staging, &stores.manifest] {
        storage.delete(name).await?;
    }
    info!("Cleared stores {}, {}, {}", stores.content, stores.staging, stores.manifest);
    Ok(())
}
