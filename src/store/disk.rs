//! On-disk store backend
//!
//! Each store is a directory under the storage root. Each entry is a pair of
//! files named by the SHA256 of the request identity:
//!
//! - `<digest>.json` - request, status, headers and write time
//! - `<digest>.body` - raw response bytes
//!
//! Files are written to a temp name and renamed into place, body first, so
//! `keys` only ever sees entries whose body is complete.

use crate::error::{ShellCacheError, ShellCacheResult};
use crate::store::storage::{ensure_cacheable, validate_store_name, CacheStorage, CacheStore};
use crate::store::types::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";

/// Registry of stores kept as directories under a root
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Create a registry rooted at `root` (created on first open)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory holding all stores
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> ShellCacheResult<PathBuf> {
        validate_store_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> ShellCacheResult<Arc<dyn CacheStore>> {
        let dir = self.store_dir(name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShellCacheError::io(format!("creating store {}", dir.display()), e))?;

        Ok(Arc::new(DiskStore {
            name: name.to_string(),
            dir,
        }))
    }

    async fn delete(&self, name: &str) -> ShellCacheResult<bool> {
        let dir = self.store_dir(name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted store directory {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ShellCacheError::io(
                format!("deleting store {}", dir.display()),
                e,
            )),
        }
    }

    async fn has(&self, name: &str) -> ShellCacheResult<bool> {
        let dir = self.store_dir(name)?;
        Ok(fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()))
    }

    async fn names(&self) -> ShellCacheResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(ShellCacheError::io("reading storage root", e)),
        };

        let mut names = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShellCacheError::io("reading storage entry", e))?
        {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Metadata stored alongside each body file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    request: Request,
    status: u16,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    stored_at: DateTime<Utc>,
}

/// A single store directory
pub struct DiskStore {
    name: String,
    dir: PathBuf,
}

impl DiskStore {
    /// Stable file stem for a request identity
    fn digest(request: &Request) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.method.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(request.url.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn entry_path(&self, request: &Request, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", Self::digest(request), ext))
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> ShellCacheResult<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, contents)
            .await
            .map_err(|e| ShellCacheError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| ShellCacheError::io(format!("renaming into {}", path.display()), e))
    }

    async fn read_meta(&self, path: &Path) -> ShellCacheResult<Option<EntryMeta>> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ShellCacheError::io(
                    format!("reading entry {}", path.display()),
                    e,
                ))
            }
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| ShellCacheError::entry_corrupt(&self.name, e.to_string()))
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> ShellCacheResult<Option<Response>> {
        let Some(meta) = self.read_meta(&self.entry_path(request, META_EXT)).await? else {
            return Ok(None);
        };

        let body_path = self.entry_path(request, BODY_EXT);
        let body = fs::read(&body_path).await.map_err(|e| {
            ShellCacheError::entry_corrupt(
                &self.name,
                format!("missing body for {}: {}", meta.request, e),
            )
        })?;

        Ok(Some(Response {
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, request: &Request, response: &Response) -> ShellCacheResult<()> {
        ensure_cacheable(request)?;

        let meta = EntryMeta {
            request: request.clone(),
            status: response.status,
            headers: response.headers.clone(),
            stored_at: Utc::now(),
        };

        self.write_atomic(&self.entry_path(request, BODY_EXT), &response.body)
            .await?;
        self.write_atomic(
            &self.entry_path(request, META_EXT),
            &serde_json::to_vec_pretty(&meta)?,
        )
        .await
    }

    async fn delete(&self, request: &Request) -> ShellCacheResult<bool> {
        let meta_path = self.entry_path(request, META_EXT);
        let existed = match fs::remove_file(&meta_path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(ShellCacheError::io(
                    format!("deleting entry {}", meta_path.display()),
                    e,
                ))
            }
        };

        let body_path = self.entry_path(request, BODY_EXT);
        if let Err(e) = fs::remove_file(&body_path).await {
            if e.kind() != ErrorKind::NotFound {
                return Err(ShellCacheError::io(
                    format!("deleting entry {}", body_path.display()),
                    e,
                ));
            }
        }

        Ok(existed)
    }

    async fn keys(&self) -> ShellCacheResult<Vec<Request>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(ShellCacheError::io(
                    format!("reading store {}", self.dir.display()),
                    e,
                ))
            }
        };

        let mut keys = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShellCacheError::io("reading store entry", e))?
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == META_EXT) {
                continue;
            }

            match self.read_meta(&path).await {
                Ok(Some(meta)) => keys.push((meta.stored_at, meta.request)),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        // Oldest first, approximating insertion order
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(keys.into_iter().map(|(_, request)| request).collect())
    }
}
