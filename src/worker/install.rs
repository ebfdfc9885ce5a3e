//! Install-time prefetch of the application shell
//!
//! Staging is rebuilt from scratch on every install. Once every core resource
//! is stored, a marker entry holding the manifest is written last, so only a
//! completed install for that exact manifest is ever picked up by activation.

use crate::error::ShellCacheResult;
use crate::manifest::Manifest;
use crate::net::{FetchOptions, Fetcher};
use crate::store::{CacheStorage, Request, Response};
use crate::worker::{Origin, StoreNames};
use tracing::debug;

/// Identity of the staging marker; outside any http origin
const STAGED_KEY: &str = "shellcache:staged";

fn marker_request() -> Request {
    Request::get(STAGED_KEY)
}

/// Whether a staging key is the marker rather than a fetched resource
pub(crate) fn is_marker(request: &Request) -> bool {
    request.url == STAGED_KEY
}

/// Whether staging holds a completed install of exactly `manifest`
///
/// Never creates the staging store.
pub async fn is_staged_for(
    storage: &dyn CacheStorage,
    stores: &StoreNames,
    manifest: &Manifest,
) -> ShellCacheResult<bool> {
    if !storage.has(&stores.staging).await? {
        return Ok(false);
    }

    let staging = storage.open(&stores.staging).await?;
    let Some(marker) = staging.match_request(&marker_request()).await? else {
        debug!("{} has no install marker", stores.staging);
        return Ok(false);
    };

    match serde_json::from_slice::<Manifest>(&marker.body) {
        Ok(staged) => Ok(staged == *manifest),
        Err(e) => {
            debug!("Unreadable install marker in {}: {}", stores.staging, e);
            Ok(false)
        }
    }
}

/// Result of a successful install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    /// Core resources fetched into staging
    pub fetched: usize,
}

/// Fetches every core resource into the staging store
pub struct Installer<'a> {
    storage: &'a dyn CacheStorage,
    fetcher: &'a dyn Fetcher,
    origin: &'a Origin,
    stores: &'a StoreNames,
    manifest: &'a Manifest,
}

impl<'a> Installer<'a> {
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

    /// Fetch the core set with a forced reload, all or nothing
    pub async fn run(&self) -> ShellCacheResult<InstallReport> {
        let requests: Vec<Request> = self
            .manifest
            .core()
            .iter()
            .map(|path| Request::get(self.origin.url_for(path)))
            .collect();

        debug!(
            "Prefetching {} core resources into {}",
            requests.len(),
            self.stores.staging
        );

        self.storage.delete(&self.stores.staging).await?;
        let staging = self.storage.open(&self.stores.staging).await?;
        staging
            .add_all(self.fetcher, &requests, FetchOptions::reload())
            .await?;

        let marker = Response::new(200, serde_json::to_vec(self.manifest)?)
            .with_header("content-type", "application/json");
        staging.put(&marker_request(), &marker).await?;

        Ok(InstallReport {
            fetched: requests.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use crate::testing::{FailingStorage, RecordingFetcher};

    fn manifest() -> Manifest {
        Manifest::new(
            [("index.html", "i1"), ("main.js", "m1"), ("logo.png", "l1")],
            ["index.html", "main.js"],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_core_with_reload() {
        let storage = MemoryStorage::new();
        let fetcher = RecordingFetcher::new();
        fetcher.route("https://app.test/index.html", 200, "index");
        fetcher.route("https://app.test/main.js", 200, "main");
        let origin = Origin::parse("https://app.test").unwrap();
        let stores = StoreNames::default();
        let manifest = manifest();

        let report = Installer::new(&storage, &fetcher, &origin, &stores, &manifest)
            .run()
            .await
            .unwrap();

        assert_eq!(report.fetched, 2);
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(_, options)| options.reload));
        assert!(!calls.iter().any(|(url, _)| url.ends_with("logo.png")));

        let staging = storage.open(&stores.staging).await.unwrap();
        let resources: Vec<Request> = staging
            .keys()
            .await
            .unwrap()
            .into_iter()
            .filter(|request| !is_marker(request))
            .collect();
        assert_eq!(resources.len(), 2);
        assert!(is_staged_for(&storage, &stores, &manifest).await.unwrap());
        assert!(!storage.has(&stores.content).await.unwrap());
    }

    #[tokio::test]
    async fn marker_names_the_installed_manifest() {
        let storage = MemoryStorage::new();
        let fetcher = RecordingFetcher::new();
        fetcher.route("https://app.test/index.html", 200, "index");
        fetcher.route("https://app.test/main.js", 200, "main");
        let origin = Origin::parse("https://app.test").unwrap();
        let stores = StoreNames::default();
        let installed = manifest();
        let changed = Manifest::new(
            [("index.html", "i1"), ("main.js", "m2"), ("logo.png", "l1")],
            ["index.html", "main.js"],
        )
        .unwrap();

        assert!(!is_staged_for(&storage, &stores, &installed).await.unwrap());
        assert!(!storage.has(&stores.staging).await.unwrap());

        Installer::new(&storage, &fetcher, &origin, &stores, &installed)
            .run()
            .await
            .unwrap();

        assert!(is_staged_for(&storage, &stores, &installed).await.unwrap());
        assert!(!is_staged_for(&storage, &stores, &changed).await.unwrap());
    }

    #[tokio::test]
    async fn reinstall_drops_previous_staging() {
        let storage = MemoryStorage::new();
        let fetcher = RecordingFetcher::new();
        fetcher.route("https://app.test/index.html", 200, "index");
        fetcher.route("https://app.test/main.js", 200, "main");
        fetcher.route("https://app.test/logo.png", 200, "png");
        let origin = Origin::parse("https://app.test").unwrap();
        let stores = StoreNames::default();
        let first = Manifest::new([("logo.png", "l1")], ["logo.png"]).unwrap();

        Installer::new(&storage, &fetcher, &origin, &stores, &first)
            .run()
            .await
            .unwrap();
        Installer::new(&storage, &fetcher, &origin, &stores, &manifest())
            .run()
            .await
            .unwrap();

        let staging = storage.open(&stores.staging).await.unwrap();
        let hit = staging
            .match_request(&Request::get("https://app.test/logo.png"))
            .await
            .unwrap();
        assert!(hit.is_none());
        assert!(!is_staged_for(&storage, &stores, &first).await.unwrap());
    }

    #[tokio::test]
    async fn partial_write_leaves_no_marker() {
        let storage = MemoryStorage::new();
        let fetcher = RecordingFetcher::new();
        fetcher.route("https://app.test/index.html", 200, "index");
        fetcher.route("https://app.test/main.js", 200, "main");
        let origin = Origin::parse("https://app.test").unwrap();
        let stores = StoreNames::default();
        let manifest = manifest();
        let failing = FailingStorage::new(storage.clone(), &stores.staging);
        failing.arm_after(1);

        let err = Installer::new(&failing, &fetcher, &origin, &stores, &manifest)
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("injected"));
        assert!(!is_staged_for(&storage, &stores, &manifest).await.unwrap());
        let staging = storage.open(&stores.staging).await.unwrap();
        assert!(staging.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_leaves_staging_empty() {
        let storage = MemoryStorage::new();
        let fetcher = RecordingFetcher::new();
        fetcher.route("https://app.test/index.html", 200, "index");
        fetcher.set_offline(true);
        let origin = Origin::parse("https://app.test").unwrap();
        let stores = StoreNames::default();
        let manifest = manifest();

        let err = Installer::new(&storage, &fetcher, &origin, &stores, &manifest)
            .run()
            .await
            .unwrap_err();

        assert!(err.is_fetch_failure());
        let staging = storage.open(&stores.staging).await.unwrap();
        assert!(staging.keys().await.unwrap().is_empty());
    }
}
