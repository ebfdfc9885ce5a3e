//! Resource manifest parsing
//!
//! The manifest is produced at deploy time as JSON:
//!
//! ```json
//! {
//!   "resources": { "main.js": "59620db4", "/": "2ae96e54" },
//!   "core": ["main.js", "index.html"]
//! }
//! ```
//!
//! The persisted record kept in the manifest store is the `resources`
//! mapping alone, serialized the same way.

use crate::error::{ShellCacheError, ShellCacheResult};
use crate::store::Response;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Key of the single record held by the manifest store
pub const RECORD_KEY: &str = "manifest";

/// One deployed version: path -> fingerprint, plus the shell subset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Every cacheable resource and its content fingerprint
    resources: BTreeMap<String, String>,

    /// Resources needed before the app can run
    #[serde(default)]
    core: Vec<String>,
}

impl Manifest {
    /// Build a manifest, checking every core path is a known resource
    pub fn new<P, F, C>(
        resources: impl IntoIterator<Item = (P, F)>,
        core: impl IntoIterator<Item = C>,
    ) -> ShellCacheResult<Self>
    where
        P: Into<String>,
        F: Into<String>,
        C: Into<String>,
    {
        let manifest = Self {
            resources: resources
                .into_iter()
                .map(|(p, f)| (p.into(), f.into()))
                .collect(),
            core: core.into_iter().map(Into::into).collect(),
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from a JSON file on disk
    pub async fn from_file(path: &Path) -> ShellCacheResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ShellCacheError::ManifestNotFound(path.to_path_buf()))
            }
            Err(e) => {
                return Err(ShellCacheError::io(
                    format!("reading manifest {}", path.display()),
                    e,
                ))
            }
        };

        Self::parse(&content).map_err(|e| match e {
            ShellCacheError::ManifestInvalid { reason, .. } => ShellCacheError::ManifestInvalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a manifest from a JSON string
    pub fn parse(content: &str) -> ShellCacheResult<Self> {
        let manifest: Self =
            serde_json::from_str(content).map_err(|e| ShellCacheError::ManifestInvalid {
                path: "manifest.json".into(),
                reason: e.to_string(),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> ShellCacheResult<()> {
        match self.core.iter().find(|p| !self.resources.contains_key(*p)) {
            Some(path) => Err(ShellCacheError::CorePathUnknown(path.clone())),
            None => Ok(()),
        }
    }

    /// Fingerprint for a path, if the path is a known resource
    pub fn fingerprint(&self, path: &str) -> Option<&str> {
        self.resources.get(path).map(String::as_str)
    }

    /// Whether a path is a known resource
    pub fn contains(&self, path: &str) -> bool {
        self.resources.contains_key(path)
    }

    /// All resource paths, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Core shell paths, in declaration order
    pub fn core(&self) -> &[String] {
        &self.core
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the manifest lists no resources
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Whether `path` is listed here with the same fingerprint the record holds
    pub fn is_unchanged_since(&self, previous: &ManifestRecord, path: &str) -> bool {
        match (self.fingerprint(path), previous.fingerprint(path)) {
            (Some(current), Some(old)) => current == old,
            _ => false,
        }
    }

    /// The record persisted after a successful reconciliation
    pub fn record(&self) -> ManifestRecord {
        ManifestRecord {
            resources: self.resources.clone(),
        }
    }
}

/// What is currently cached: the resources mapping of the last activated manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestRecord {
    resources: BTreeMap<String, String>,
}

impl ManifestRecord {
    /// Fingerprint recorded for a path
    pub fn fingerprint(&self, path: &str) -> Option<&str> {
        self.resources.get(path).map(String::as_str)
    }

    /// Number of recorded resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the record lists no resources
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Whether the record describes exactly this manifest's resources
    pub fn matches(&self, manifest: &Manifest) -> bool {
        self.resources == manifest.resources
    }

    /// Serialize into a storable response
    pub fn to_response(&self) -> ShellCacheResult<Response> {
        Ok(Response::new(200, serde_json::to_vec(self)?)
            .with_header("content-type", "application/json"))
    }

    /// Decode a stored response
    pub fn from_response(response: &Response) -> ShellCacheResult<Self> {
        serde_json::from_slice(&response.body)
            .map_err(|e| ShellCacheError::RecordCorrupt(e.to_string()))
    }
}
