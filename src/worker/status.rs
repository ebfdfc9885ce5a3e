//! Read-only comparison of the cache against the manifest

use crate::error::ShellCacheResult;
use crate::manifest::{Manifest, ManifestRecord, RECORD_KEY};
use crate::store::{CacheStorage, Request};
use crate::worker::{Origin, StoreNames};
use serde::Serialize;
use std::collections::BTreeSet;

/// State of the persisted manifest record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Never activated, or torn down
    Absent,
    /// Record matches the current manifest
    Current,
    /// Record belongs to another deploy; the next activation reconciles
    Outdated,
    /// Record exists but cannot be decoded
    Corrupt,
}

/// Snapshot of the content store relative to the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    /// Manifest paths present in the content store
    pub cached: Vec<String>,
    /// Manifest paths not yet cached
    pub missing: Vec<String>,
    /// Content entries that no manifest path accounts for
    pub stray: Vec<String>,
    pub record: RecordState,
}

/// Inspect the stores without creating any of them
pub async fn inspect(
    storage: &dyn CacheStorage,
    origin: &Origin,
    stores: &StoreNames,
    manifest: &Manifest,
) -> ShellCacheResult<CacheStatus> {
    let mut present = BTreeSet::new();
    let mut stray = Vec::new();

    if storage.has(&stores.content).await? {
        let content = storage.open(&stores.content).await?;
        for request in content.keys().await? {
            match origin.entry_path(&request.url) {
                Some(path) if manifest.contains(&path) => {
                    present.insert(path);
                }
                _ => stray.push(request.url),
            }
        }
    }

    let (cached, missing): (Vec<String>, Vec<String>) = manifest
        .paths()
        .map(str::to_string)
        .partition(|path| present.contains(path));

    Ok(CacheStatus {
        cached,
        missing,
        stray,
        record: record_state(storage, origin, stores, manifest).await?,
    })
}

async fn record_state(
    storage: &dyn CacheStorage,
    origin: &Origin,
    stores: &StoreNames,
    manifest: &Manifest,
) -> ShellCacheResult<RecordState> {
    if !storage.has(&stores.manifest).await? {
        return Ok(RecordState::Absent);
    }

    let store = storage.open(&stores.manifest).await?;
    let Some(response) = store
        .match_request(&Request::get(origin.url_for(RECORD_KEY)))
        .await?
    else {
        return Ok(RecordState::Absent);
    };

    Ok(match ManifestRecord::from_response(&response) {
        Ok(record) if record.matches(manifest) => RecordState::Current,
        Ok(_) => RecordState::Outdated,
        Err(_) => RecordState::Corrupt,
    })
}
