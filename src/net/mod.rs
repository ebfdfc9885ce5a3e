//! Network fetch capability
//!
//! The worker never talks to the network directly; it goes through a
//! `Fetcher`, so hosts can plug in a real HTTP client or a test double.

mod http;

pub use http::HttpFetcher;

use crate::error::ShellCacheResult;
use crate::store::{Request, Response};
use async_trait::async_trait;

/// Per-request fetch options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Bypass any intermediate HTTP cache and force a full reload
    pub reload: bool,
}

impl FetchOptions {
    /// Options forcing a full network reload
    pub fn reload() -> Self {
        Self { reload: true }
    }
}

/// Abstract network fetch
///
/// Transport failures (unreachable host, timeout, reset) are errors. A
/// completed exchange is always `Ok`, whatever its status; callers decide
/// what a non-success status means for them.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform a request
    async fn fetch(&self, request: &Request, options: FetchOptions) -> ShellCacheResult<Response>;
}
