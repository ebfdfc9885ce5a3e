//! Serving origin and logical resource paths
//!
//! Manifest keys are paths relative to the origin without a leading slash
//! (`main.js`, `assets/x.png`), except the document root which is `/`.

use crate::error::{ShellCacheError, ShellCacheResult};
use std::fmt;

/// Marker of a cache-busting query suffix
const VERSION_QUERY: &str = "?v=";

/// Logical path of the document root
pub const ROOT_PATH: &str = "/";

/// The scheme + host (+ port) the app is served from, without trailing slash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin(String);

impl Origin {
    /// Parse an origin such as `https://app.example.com` or `http://localhost:8080/`
    pub fn parse(origin: &str) -> ShellCacheResult<Self> {
        let trimmed = origin.trim().trim_end_matches('/');
        let invalid = |reason: &str| ShellCacheError::OriginInvalid {
            origin: origin.to_string(),
            reason: reason.to_string(),
        };

        let host = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(|| invalid("expected an http:// or https:// URL"))?;

        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        if host.contains(['/', '?', '#']) {
            return Err(invalid("an origin has no path, query or fragment"));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute URL of a logical path
    pub fn url_for(&self, path: &str) -> String {
        if path == ROOT_PATH {
            format!("{}/", self.0)
        } else {
            format!("{}/{}", self.0, path.trim_start_matches('/'))
        }
    }

    /// Text after `origin/`, or `None` for URLs on another origin
    fn relative<'a>(&self, url: &'a str) -> Option<&'a str> {
        let rest = url.strip_prefix(self.0.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }

    /// Logical path of a stored entry: origin stripped, empty becomes `/`.
    ///
    /// Query strings are kept, so a versioned URL never matches a plain
    /// manifest key.
    pub fn entry_path(&self, url: &str) -> Option<String> {
        let rest = self.relative(url)?;
        Some(if rest.is_empty() {
            ROOT_PATH.to_string()
        } else {
            rest.to_string()
        })
    }

    /// Logical path of an inbound request.
    ///
    /// Drops a trailing `?v=...` cache buster, and maps the origin itself,
    /// in-page anchor routes (`origin/#...`) and the empty path to `/`.
    pub fn request_path(&self, url: &str) -> Option<String> {
        let rest = self.relative(url)?;
        let path = match rest.find(VERSION_QUERY) {
            Some(idx) => &rest[..idx],
            None => rest,
        };

        if url == self.0 || rest.starts_with('#') || path.is_empty() {
            return Some(ROOT_PATH.to_string());
        }
        Some(path.to_string())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
