//! Error types for shellcache
//!
//! All modules use `ShellCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shellcache operations
pub type ShellCacheResult<T> = Result<T, ShellCacheError>;

/// All errors that can occur in shellcache
#[derive(Error, Debug)]
pub enum ShellCacheError {
    // Manifest errors
    #[error("Manifest file not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("No manifest configured")]
    ManifestMissing,

    #[error("Invalid manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Core resource {0} is not listed in the manifest resources")]
    CorePathUnknown(String),

    #[error("Persisted manifest record is corrupt: {0}")]
    RecordCorrupt(String),

    // Store errors
    #[error("Invalid store name: {0}")]
    StoreNameInvalid(String),

    #[error("Corrupt entry in store {store}: {reason}")]
    StoreEntryCorrupt { store: String, reason: String },

    #[error("Only GET requests can be stored, got {method} {url}")]
    MethodNotCacheable { method: String, url: String },

    // Network errors
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Fetch for {url} returned status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("Unsupported request method for fetch: {0}")]
    MethodUnsupported(String),

    // Lifecycle errors
    #[error("Cannot {event} while worker is {state}")]
    InvalidTransition { event: String, state: String },

    #[error("Staging store {0} holds no completed install of this manifest")]
    NotStaged(String),

    #[error("Invalid origin {origin}: {reason}")]
    OriginInvalid { origin: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl ShellCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport-level fetch error
    pub fn fetch_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an error for a fetch that completed with a non-success status
    pub fn fetch_status(url: impl Into<String>, status: u16) -> Self {
        Self::FetchStatus {
            url: url.into(),
            status,
        }
    }

    /// Create a corrupt store entry error
    pub fn entry_corrupt(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreEntryCorrupt {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error is a network fetch failure (unreachable or non-success)
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchFailed { .. } | Self::FetchStatus { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestMissing => {
                Some("Pass --manifest <file> or set app.manifest in config.toml")
            }
            Self::ManifestNotFound(_) => Some("Check the manifest path in config.toml"),
            Self::OriginInvalid { .. } => {
                Some("Set app.origin to the serving origin, e.g. https://app.example.com")
            }
            Self::FetchFailed { .. } => Some("The first run needs network access to the origin"),
            Self::RecordCorrupt(_) => Some("Run: shellcache clear --yes"),
            Self::NotStaged(_) => Some("Run: shellcache install, or shellcache deploy"),
            _ => None,
        }
    }
}
