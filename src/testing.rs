//! Test doubles for the network and storage seams

use crate::error::{ShellCacheError, ShellCacheResult};
use crate::net::{FetchOptions, Fetcher};
use crate::store::{CacheStorage, CacheStore, MemoryStorage, Request, Response};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Fetcher serving canned responses and recording every call.
///
/// Unrouted URLs answer 404.
#[derive(Default)]
pub struct RecordingFetcher {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    calls: Mutex<Vec<(String, FetchOptions)>>,
    offline: AtomicBool,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` for `url`, replacing any earlier route
    pub fn route(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.as_bytes().to_vec()));
    }

    /// Fail every fetch as unreachable while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, FetchOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> ShellCacheResult<Response> {
        self.calls
            .lock()
            .unwrap()
            .push((request.url.clone(), options));

        if self.offline.load(Ordering::SeqCst) {
            return Err(ShellCacheError::fetch_failed(&request.url, "network unreachable"));
        }

        let routes = self.routes.lock().unwrap();
        Ok(match routes.get(&request.url) {
            Some((status, body)) => Response::new(*status, body.clone()),
            None => Response::new(404, "not found"),
        })
    }
}

/// Storage wrapper counting every registry call
pub struct CountingStorage {
    inner: MemoryStorage,
    accesses: AtomicUsize,
}

impl CountingStorage {
    pub fn new(inner: MemoryStorage) -> Self {
        Self {
            inner,
            accesses: AtomicUsize::new(0),
        }
    }

    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for CountingStorage {
    async fn open(&self, name: &str) -> ShellCacheResult<Arc<dyn CacheStore>> {
        self.touch();
        self.inner.open(name).await
    }

    async fn delete(&self, name: &str) -> ShellCacheResult<bool> {
        self.touch();
        self.inner.delete(name).await
    }

    async fn has(&self, name: &str) -> ShellCacheResult<bool> {
        self.touch();
        self.inner.has(name).await
    }

    async fn names(&self) -> ShellCacheResult<Vec<String>> {
        self.touch();
        self.inner.names().await
    }
}

/// Storage whose `put` on one named store fails once armed
pub struct FailingStorage {
    inner: MemoryStorage,
    target: String,
    trigger: Arc<PutTrigger>,
}

/// Shared between the storage and every store handle it opens
#[derive(Default)]
struct PutTrigger {
    armed: AtomicBool,
    allowed: AtomicUsize,
}

impl PutTrigger {
    /// Whether the next put should fail, consuming one allowed put if not
    fn fire(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
            && self
                .allowed
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
    }
}

impl FailingStorage {
    pub fn new(inner: MemoryStorage, target: &str) -> Self {
        Self {
            inner,
            target: target.to_string(),
            trigger: Arc::new(PutTrigger::default()),
        }
    }

    /// Start failing writes to the target store
    pub fn arm(&self) {
        self.arm_after(0);
    }

    /// Let `n` more writes to the target store succeed, then fail the rest
    pub fn arm_after(&self, n: usize) {
        self.trigger.allowed.store(n, Ordering::SeqCst);
        self.trigger.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for FailingStorage {
    async fn open(&self, name: &str) -> ShellCacheResult<Arc<dyn CacheStore>> {
        let store = self.inner.open(name).await?;
        if name != self.target {
            return Ok(store);
        }
        Ok(Arc::new(FailingStore {
            inner: store,
            trigger: Arc::clone(&self.trigger),
        }))
    }

    async fn delete(&self, name: &str) -> ShellCacheResult<bool> {
        self.inner.delete(name).await
    }

    async fn has(&self, name: &str) -> ShellCacheResult<bool> {
        self.inner.has(name).await
    }

    async fn names(&self) -> ShellCacheResult<Vec<String>> {
        self.inner.names().await
    }
}

struct FailingStore {
    inner: Arc<dyn CacheStore>,
    trigger: Arc<PutTrigger>,
}

#[async_trait]
impl CacheStore for FailingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn match_request(&self, request: &Request) -> ShellCacheResult<Option<Response>> {
        self.inner.match_request(request).await
    }

    async fn put(&self, request: &Request, response: &Response) -> ShellCacheResult<()> {
        if self.trigger.fire() {
            return Err(ShellCacheError::Internal(format!(
                "injected put failure for {}",
                request.url
            )));
        }
        self.inner.put(request, response).await
    }

    async fn delete(&self, request: &Request) -> ShellCacheResult<bool> {
        self.inner.delete(request).await
    }

    async fn keys(&self) -> ShellCacheResult<Vec<Request>> {
        self.inner.keys().await
    }
}
