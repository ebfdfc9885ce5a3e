//! Configuration schema for shellcache
//!
//! Configuration is stored at `~/.config/shellcache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Application being cached
    pub app: AppConfig,

    /// Store names
    pub stores: StoresConfig,

    /// Store backend settings
    pub storage: StorageConfig,

    /// HTTP fetcher settings
    pub network: NetworkConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable the lifecycle audit journal
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serving origin, e.g. `https://app.example.com`
    pub origin: String,

    /// Path to the deployed resource manifest (JSON)
    pub manifest: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            manifest: None,
        }
    }
}

/// Names of the three stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoresConfig {
    /// Long-lived store serving traffic
    pub content: String,

    /// Transient store filled at install
    pub staging: String,

    /// Store holding the persisted manifest record
    pub manifest: String,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            content: "shellcache-content".to_string(),
            staging: "shellcache-staging".to_string(),
            manifest: "shellcache-manifest".to_string(),
        }
    }
}

/// Store backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding store directories (defaults to the state dir)
    pub dir: Option<PathBuf>,
}

/// HTTP fetcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Overall timeout per request
    pub timeout_secs: u64,

    /// Largest response body accepted
    pub max_body_mb: u64,

    /// User-Agent header value
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_body_mb: 64,
            user_agent: format!("shellcache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
