//! Cache storage abstraction
//!
//! Provides traits for named request/response stores that can be implemented
//! by different backends (in-memory for embedders and tests, on-disk for the CLI).

use crate::error::{ShellCacheError, ShellCacheResult};
use crate::net::{FetchOptions, Fetcher};
use crate::store::types::{Method, Request, Response};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// A single named store of request -> response pairs
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Name the store was opened under
    fn name(&self) -> &str;

    /// Look up the stored response for a request
    async fn match_request(&self, request: &Request) -> ShellCacheResult<Option<Response>>;

    /// Store a response, replacing any previous entry for the request
    async fn put(&self, request: &Request, response: &Response) -> ShellCacheResult<()>;

    /// Remove an entry; returns whether one existed
    async fn delete(&self, request: &Request) -> ShellCacheResult<bool>;

    /// All request identities currently stored
    async fn keys(&self) -> ShellCacheResult<Vec<Request>>;

    /// Fetch every request and store the results, all or nothing.
    ///
    /// Every fetch must complete with a success status before anything is
    /// written, so a failed fetch leaves the store untouched. A failed write
    /// rolls back the entries this call already wrote, restoring any entry
    /// they replaced. Rollback is best effort; its own failures are logged.
    async fn add_all(
        &self,
        fetcher: &dyn Fetcher,
        requests: &[Request],
        options: FetchOptions,
    ) -> ShellCacheResult<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let fetched = try_join_all(requests.iter().map(|request| async move {
            let response = fetcher.fetch(request, options).await?;
            if !response.is_success() {
                return Err(ShellCacheError::fetch_status(&request.url, response.status));
            }
            Ok((request, response))
        }))
        .await?;

        let mut written: Vec<(&Request, Option<Response>)> = Vec::with_capacity(fetched.len());
        for (request, response) in &fetched {
            let replaced = self.match_request(request).await?;
            if let Err(e) = self.put(request, response).await {
                roll_back(self, written).await;
                return Err(e);
            }
            written.push((*request, replaced));
        }

        debug!("Stored {} fetched entries in {}", fetched.len(), self.name());
        Ok(())
    }
}

/// Undo the writes of a failed `add_all`, newest first
async fn roll_back<S: CacheStore + ?Sized>(store: &S, written: Vec<(&Request, Option<Response>)>) {
    debug!("Rolling back {} entries in {}", written.len(), store.name());
    for (request, replaced) in written.into_iter().rev() {
        let undone = match &replaced {
            Some(previous) => store.put(request, previous).await,
            None => store.delete(request).await.map(|_| ()),
        };
        if let Err(e) = undone {
            warn!("Failed to roll back {} in {}: {}", request.url, store.name(), e);
        }
    }
}

/// Registry of named stores
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store by name, creating it if it does not exist
    async fn open(&self, name: &str) -> ShellCacheResult<Arc<dyn CacheStore>>;

    /// Delete a store and all its entries; returns whether it existed
    async fn delete(&self, name: &str) -> ShellCacheResult<bool>;

    /// Whether a store exists, without creating it
    async fn has(&self, name: &str) -> ShellCacheResult<bool>;

    /// Names of all existing stores
    async fn names(&self) -> ShellCacheResult<Vec<String>>;
}

/// Check a store name is non-empty and limited to `[A-Za-z0-9._-]`
pub fn validate_store_name(name: &str) -> ShellCacheResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(ShellCacheError::StoreNameInvalid(name.to_string()))
    }
}

/// Reject requests that a store cannot hold
pub(crate) fn ensure_cacheable(request: &Request) -> ShellCacheResult<()> {
    if request.method == Method::Get {
        Ok(())
    } else {
        Err(ShellCacheError::MethodNotCacheable {
            method: request.method.to_string(),
            url: request.url.clone(),
        })
    }
}
