//! HTTP fetcher backed by ureq
//!
//! ureq is blocking, so each fetch runs on tokio's blocking pool.

use crate::config::schema::NetworkConfig;
use crate::error::{ShellCacheError, ShellCacheResult};
use crate::net::{FetchOptions, Fetcher};
use crate::store::{Method, Request, Response};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Fetcher issuing real HTTP requests
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
    user_agent: String,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher from network settings
    pub fn new(config: &NetworkConfig) -> Self {
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Self {
            agent: Agent::new_with_config(agent_config),
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    fn fetch_blocking(&self, request: &Request, options: FetchOptions) -> ShellCacheResult<Response> {
        let url = request.url.as_str();
        let fail = |e: ureq::Error| ShellCacheError::fetch_failed(url, e.to_string());

        let builder = match request.method {
            Method::Get => self.agent.get(url),
            Method::Head => self.agent.head(url),
            other => return Err(ShellCacheError::MethodUnsupported(other.to_string())),
        };

        let mut builder = builder.header("User-Agent", self.user_agent.as_str());
        if options.reload {
            builder = builder
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache");
        }

        let mut response = builder.call().map_err(fail)?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(fail)?;

        debug!("{} -> {} ({} bytes)", request, status, body.len());
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> ShellCacheResult<Response> {
        let fetcher = self.clone();
        let request = request.clone();

        tokio::task::spawn_blocking(move || fetcher.fetch_blocking(&request, options))
            .await
            .map_err(|e| ShellCacheError::Internal(format!("fetch task failed: {}", e)))?
    }
}
