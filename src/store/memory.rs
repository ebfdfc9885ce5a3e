//! In-process store backend
//!
//! Handles returned by `open` share state with the registry, so every
//! component opening the same name sees the same entries. A handle kept
//! across `delete` keeps working but is detached from the registry.

use crate::error::{ShellCacheError, ShellCacheResult};
use crate::store::storage::{ensure_cacheable, validate_store_name, CacheStorage, CacheStore};
use crate::store::types::{Request, Response};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Registry of in-memory stores
#[derive(Clone, Default)]
pub struct MemoryStorage {
    stores: Arc<Mutex<HashMap<String, Arc<MemoryStore>>>>,
}

impl MemoryStorage {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> ShellCacheResult<MutexGuard<'_, HashMap<String, Arc<MemoryStore>>>> {
        self.stores
            .lock()
            .map_err(|e| ShellCacheError::Internal(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> ShellCacheResult<Arc<dyn CacheStore>> {
        validate_store_name(name)?;
        let mut stores = self.registry()?;
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new(name)));
        Ok(Arc::clone(store) as Arc<dyn CacheStore>)
    }

    async fn delete(&self, name: &str) -> ShellCacheResult<bool> {
        Ok(self.registry()?.remove(name).is_some())
    }

    async fn has(&self, name: &str) -> ShellCacheResult<bool> {
        Ok(self.registry()?.contains_key(name))
    }

    async fn names(&self) -> ShellCacheResult<Vec<String>> {
        let mut names: Vec<String> = self.registry()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// A single in-memory store, keyed by request URL
pub struct MemoryStore {
    name: String,
    entries: Mutex<BTreeMap<String, (Request, Response)>>,
}

impl MemoryStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn entries(&self) -> ShellCacheResult<MutexGuard<'_, BTreeMap<String, (Request, Response)>>> {
        self.entries
            .lock()
            .map_err(|e| ShellCacheError::Internal(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> ShellCacheResult<Option<Response>> {
        Ok(self
            .entries()?
            .get(&request.url)
            .filter(|(stored, _)| stored.method == request.method)
            .map(|(_, response)| response.clone()))
    }

    async fn put(&self, request: &Request, response: &Response) -> ShellCacheResult<()> {
        ensure_cacheable(request)?;
        self.entries()?
            .insert(request.url.clone(), (request.clone(), response.clone()));
        Ok(())
    }

    async fn delete(&self, request: &Request) -> ShellCacheResult<bool> {
        Ok(self.entries()?.remove(&request.url).is_some())
    }

    async fn keys(&self) -> ShellCacheResult<Vec<Request>> {
        Ok(self
            .entries()?
            .values()
            .map(|(request, _)| request.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Method;

    #[tokio::test]
    async fn open_is_lazy_and_shared() {
        let storage = MemoryStorage::new();
        assert!(!storage.has("content").await.unwrap());

        let first = storage.open("content").await.unwrap();
        let second = storage.open("content").await.unwrap();
        assert!(storage.has("content").await.unwrap());

        first
            .put(&Request::get("https://app.test/a.js"), &Response::new(200, "a"))
            .await
            .unwrap();

        let hit = second
            .match_request(&Request::get("https://app.test/a.js"))
            .await
            .unwrap();
        assert_eq!(hit.unwrap().body, b"a");
    }

    #[tokio::test]
    async fn delete_store_drops_entries() {
        let storage = MemoryStorage::new();
        let store = storage.open("staging").await.unwrap();
        store
            .put(&Request::get("https://app.test/a.js"), &Response::new(200, "a"))
            .await
            .unwrap();

        assert!(storage.delete("staging").await.unwrap());
        assert!(!storage.delete("staging").await.unwrap());

        let reopened = storage.open("staging").await.unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_entry_reports_presence() {
        let storage = MemoryStorage::new();
        let store = storage.open("content").await.unwrap();
        let request = Request::get("https://app.test/a.js");
        store.put(&request, &Response::new(200, "a")).await.unwrap();

        assert!(store.delete(&request).await.unwrap());
        assert!(!store.delete(&request).await.unwrap());
        assert!(store.match_request(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn match_respects_method() {
        let storage = MemoryStorage::new();
        let store = storage.open("content").await.unwrap();
        store
            .put(&Request::get("https://app.test/a.js"), &Response::new(200, "a"))
            .await
            .unwrap();

        let head = Request::new(Method::Head, "https://app.test/a.js");
        assert!(store.match_request(&head).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn names_are_sorted() {
        let storage = MemoryStorage::new();
        storage.open("b").await.unwrap();
        storage.open("a").await.unwrap();
        assert_eq!(storage.names().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn rejects_invalid_names() {
        let storage = MemoryStorage::new();
        assert!(storage.open("../escape").await.is_err());
    }
}
