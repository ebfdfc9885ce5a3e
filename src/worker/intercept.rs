//! Request interception
//!
//! Requests for paths outside the manifest are never touched. The document
//! root is served network-first so the shell HTML stays current while online;
//! every other manifest path is cache-first and populated lazily on a miss.

use crate::error::ShellCacheResult;
use crate::manifest::Manifest;
use crate::net::{FetchOptions, Fetcher};
use crate::store::{CacheStorage, CacheStore, Method, Request, Response};
use crate::worker::{Origin, StoreNames, ROOT_PATH};
use std::fmt;
use tracing::{debug, warn};

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Live network response
    Network,
    /// Content store hit
    Cache,
    /// Content store fallback after the network failed
    Offline,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Cache => write!(f, "cache"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// What the worker does with an inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDisposition {
    /// Not handled; the host performs its default network fetch
    Passthrough,
    /// Handled by the worker
    Respond {
        response: Response,
        source: ResponseSource,
    },
}

impl FetchDisposition {
    fn respond(response: Response, source: ResponseSource) -> Self {
        Self::Respond { response, source }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Self::Passthrough => None,
            Self::Respond { source, .. } => Some(*source),
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Passthrough => None,
            Self::Respond { response, .. } => Some(response),
        }
    }
}

/// Serves manifest resources from the content store
pub struct Interceptor<'a> {
    storage: &'a dyn CacheStorage,
    fetcher: &'a dyn Fetcher,
    origin: &'a Origin,
    stores: &'a StoreNames,
    manifest: &'a Manifest,
}

impl<'a> Interceptor<'a> {
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

    /// Decide and serve one request
    pub async fn handle(&self, request: &Request) -> ShellCacheResult<FetchDisposition> {
        if request.method != Method::Get {
            return Ok(FetchDisposition::Passthrough);
        }

        let path = match self.origin.request_path(&request.url) {
            Some(path) if self.manifest.contains(&path) => path,
            _ => {
                debug!("Passthrough {}", request.url);
                return Ok(FetchDisposition::Passthrough);
            }
        };

        let content = self.storage.open(&self.stores.content).await?;
        if path == ROOT_PATH {
            self.network_first(content.as_ref(), request).await
        } else {
            self.cache_first(content.as_ref(), request).await
        }
    }

    /// Live fetch, falling back to the cached root document
    async fn network_first(
        &self,
        content: &dyn CacheStore,
        request: &Request,
    ) -> ShellCacheResult<FetchDisposition> {
        // All spellings of the root share one entry
        let key = Request::get(self.origin.url_for(ROOT_PATH));

        match self.fetcher.fetch(request, FetchOptions::default()).await {
            Ok(response) if response.is_success() => {
                store_copy(content, &key, &response).await;
                Ok(FetchDisposition::respond(response, ResponseSource::Network))
            }
            Ok(response) => match content.match_request(&key).await? {
                Some(cached) => {
                    debug!(
                        "Root returned {}, serving cached copy",
                        response.status
                    );
                    Ok(FetchDisposition::respond(cached, ResponseSource::Offline))
                }
                None => Ok(FetchDisposition::respond(response, ResponseSource::Network)),
            },
            Err(e) => match content.match_request(&key).await? {
                Some(cached) => {
                    debug!("Network unavailable for root, serving cached copy: {}", e);
                    Ok(FetchDisposition::respond(cached, ResponseSource::Offline))
                }
                None => Err(e),
            },
        }
    }

    /// Cached copy if present, otherwise fetch and keep a copy
    async fn cache_first(
        &self,
        content: &dyn CacheStore,
        request: &Request,
    ) -> ShellCacheResult<FetchDisposition> {
        if let Some(cached) = content.match_request(request).await? {
            return Ok(FetchDisposition::respond(cached, ResponseSource::Cache));
        }

        let response = self.fetcher.fetch(request, FetchOptions::default()).await?;
        if response.is_success() {
            store_copy(content, request, &response).await;
        } else {
            debug!("Not caching {} ({})", request.url, response.status);
        }
        Ok(FetchDisposition::respond(response, ResponseSource::Network))
    }
}

/// Keep a copy of a live response; the caller gets the response either way
async fn store_copy(content: &dyn CacheStore, request: &Request, response: &Response) {
    if let Err(e) = content.put(request, response).await {
        warn!("Failed to cache {}: {}", request.url, e);
    }
}
