//! The offline cache worker
//!
//! Drives the cache lifecycle for one deployed manifest:
//!
//! | Event | Handler | Effect |
//! |-------|---------|--------|
//! | install | [`install`] | core resources fetched into staging |
//! | activate | [`reconcile`] | content reconciled against the persisted manifest |
//! | fetch | [`intercept`] | cache-first, or network-first for `/` |
//! | message | [`offline`] | `skipWaiting`, `downloadOffline` |
//!
//! Install and activate are serialized; fetches run independently.

pub mod install;
pub mod intercept;
pub mod offline;
pub mod origin;
pub mod reconcile;
pub mod status;

pub use install::InstallReport;
pub use intercept::{FetchDisposition, ResponseSource};
pub use offline::OfflineReport;
pub use origin::{Origin, ROOT_PATH};
pub use reconcile::{teardown, ActivationOutcome};
pub use status::{CacheStatus, RecordState};

use crate::audit::AuditLog;
use crate::config::schema::StoresConfig;
use crate::error::{ShellCacheError, ShellCacheResult};
use crate::manifest::Manifest;
use crate::net::Fetcher;
use crate::store::{CacheStorage, Request};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Names of the three stores the worker uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    pub content: String,
    pub staging: String,
    pub manifest: String,
}

impl Default for StoreNames {
    fn default() -> Self {
        Self::from(&StoresConfig::default())
    }
}

impl From<&StoresConfig> for StoreNames {
    fn from(config: &StoresConfig) -> Self {
        Self {
            content: config.content.clone(),
            staging: config.staging.clone(),
            manifest: config.manifest.clone(),
        }
    }
}

/// Lifecycle state of a worker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, no lifecycle event handled yet
    Parsed,
    Installing,
    /// Install succeeded, waiting for activation
    Installed,
    Activating,
    /// Serving traffic
    Activated,
    /// Install failed; the instance never activates
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

/// Messages a controlled page can post to the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMessage {
    /// Activate immediately instead of waiting for old instances
    SkipWaiting,
    /// Fetch every manifest resource missing from the cache
    DownloadOffline,
}

impl FromStr for WorkerMessage {
    type Err = ShellCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skipWaiting" => Ok(Self::SkipWaiting),
            "downloadOffline" => Ok(Self::DownloadOffline),
            other => Err(ShellCacheError::User(format!("Unknown message: {}", other))),
        }
    }
}

/// Result of handling a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    SkipWaiting,
    Downloaded(OfflineReport),
    /// Payload was not a known message
    Ignored,
}

/// One method per platform event; a host adapter wires events to these
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    async fn on_install(&self) -> ShellCacheResult<InstallReport>;

    async fn on_activate(&self) -> ShellCacheResult<ActivationOutcome>;

    async fn on_fetch(&self, request: &Request) -> ShellCacheResult<FetchDisposition>;

    async fn on_message(&self, payload: &str) -> ShellCacheResult<MessageOutcome>;
}

/// Offline cache worker for one manifest version
pub struct ServiceWorker {
    manifest: Manifest,
    origin: Origin,
    stores: StoreNames,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    audit: AuditLog,
    state: Mutex<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
    lifecycle: tokio::sync::Mutex<()>,
}

impl ServiceWorker {
    /// Create a worker with default store names and no audit journal
    pub fn new(
        manifest: Manifest,
        origin: Origin,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            manifest,
            origin,
            stores: StoreNames::default(),
            storage,
            fetcher,
            audit: AuditLog::disabled(),
            state: Mutex::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Use custom store names
    pub fn with_stores(mut self, stores: StoreNames) -> Self {
        self.stores = stores;
        self
    }

    /// Record lifecycle events to an audit journal
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn stores(&self) -> &StoreNames {
        &self.stores
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Whether immediate activation was requested
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether activation finished and the worker controls its clients
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    fn set_state(&self, next: WorkerState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        debug!("Worker state -> {}", next);
    }

    fn transition(&self, event: &str, allowed: &[WorkerState], next: WorkerState) -> ShellCacheResult<()> {
        let current = self.state();
        if !allowed.contains(&current) {
            return Err(ShellCacheError::InvalidTransition {
                event: event.to_string(),
                state: current.to_string(),
            });
        }
        self.set_state(next);
        Ok(())
    }

    /// Prefetch core resources into staging
    pub async fn install(&self) -> ShellCacheResult<InstallReport> {
        let _guard = self.lifecycle.lock().await;
        self.transition("install", &[WorkerState::Parsed], WorkerState::Installing)?;

        // The new version takes over without waiting for old clients
        self.skip_waiting.store(true, Ordering::SeqCst);

        let installer = install::Installer::new(
            self.storage.as_ref(),
            self.fetcher.as_ref(),
            &self.origin,
            &self.stores,
            &self.manifest,
        );

        match installer.run().await {
            Ok(report) => {
                self.set_state(WorkerState::Installed);
                info!("Installed {} core resources", report.fetched);
                self.audit
                    .log(
                        "install.completed",
                        &serde_json::json!({ "fetched": report.fetched }),
                    )
                    .await;
                Ok(report)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                self.audit
                    .log("install.failed", &serde_json::json!({ "error": e.to_string() }))
                    .await;
                Err(e)
            }
        }
    }

    /// Reconcile the cache against the manifest and take control of clients
    ///
    /// Staging must hold a completed install of this worker's manifest, made
    /// by this instance or by an earlier process. Otherwise activation is
    /// refused and the worker stays in its current state.
    pub async fn activate(&self) -> ShellCacheResult<ActivationOutcome> {
        let _guard = self.lifecycle.lock().await;
        let previous = self.state();
        self.transition(
            "activate",
            &[WorkerState::Parsed, WorkerState::Installed],
            WorkerState::Activating,
        )?;

        let reconciler = reconcile::Reconciler::new(
            self.storage.as_ref(),
            &self.origin,
            &self.stores,
            &self.manifest,
        );

        let outcome = match reconciler.run().await {
            Ok(outcome) => outcome,
            Err(e @ ShellCacheError::NotStaged(_)) => {
                warn!("Refusing to activate: {}", e);
                self.set_state(previous);
                return Err(e);
            }
            Err(e) => {
                // Teardown itself failed; nothing is known about the stores
                self.set_state(WorkerState::Redundant);
                return Err(e);
            }
        };

        self.set_state(WorkerState::Activated);
        self.clients_claimed.store(true, Ordering::SeqCst);

        let (event, data) = match &outcome {
            ActivationOutcome::Cold { copied } => {
                ("activate.cold", serde_json::json!({ "copied": copied }))
            }
            ActivationOutcome::Warm {
                kept,
                evicted,
                copied,
            } => (
                "activate.warm",
                serde_json::json!({ "kept": kept, "evicted": evicted, "copied": copied }),
            ),
            ActivationOutcome::Reset { error } => {
                ("activate.reset", serde_json::json!({ "error": error }))
            }
        };
        self.audit.log(event, &data).await;

        Ok(outcome)
    }

    /// Route one request through the interceptor
    pub async fn handle_fetch(&self, request: &Request) -> ShellCacheResult<FetchDisposition> {
        intercept::Interceptor::new(
            self.storage.as_ref(),
            self.fetcher.as_ref(),
            &self.origin,
            &self.stores,
            &self.manifest,
        )
        .handle(request)
        .await
    }

    /// Fetch every manifest resource not yet in the content store
    pub async fn download_offline(&self) -> ShellCacheResult<OfflineReport> {
        let report = offline::OfflinePrefetcher::new(
            self.storage.as_ref(),
            self.fetcher.as_ref(),
            &self.origin,
            &self.stores,
            &self.manifest,
        )
        .run()
        .await?;

        if !report.fetched.is_empty() {
            self.audit
                .log(
                    "offline.downloaded",
                    &serde_json::json!({ "fetched": report.fetched.len() }),
                )
                .await;
        }
        Ok(report)
    }

    /// Handle a message posted by a controlled page
    pub async fn handle_message(&self, payload: &str) -> ShellCacheResult<MessageOutcome> {
        match payload.parse::<WorkerMessage>() {
            Ok(WorkerMessage::SkipWaiting) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                info!("Skip waiting requested");
                Ok(MessageOutcome::SkipWaiting)
            }
            Ok(WorkerMessage::DownloadOffline) => match self.download_offline().await {
                Ok(report) => Ok(MessageOutcome::Downloaded(report)),
                Err(e) => {
                    warn!("Offline download failed: {}", e);
                    Err(e)
                }
            },
            Err(_) => {
                debug!("Ignoring message {:?}", payload);
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Compare the content store against the manifest
    pub async fn status(&self) -> ShellCacheResult<CacheStatus> {
        status::inspect(
            self.storage.as_ref(),
            &self.origin,
            &self.stores,
            &self.manifest,
        )
        .await
    }
}

#[async_trait]
impl LifecycleHandler for ServiceWorker {
    async fn on_install(&self) -> ShellCacheResult<InstallReport> {
        self.install().await
    }

    async fn on_activate(&self) -> ShellCacheResult<ActivationOutcome> {
        self.activate().await
    }

    async fn on_fetch(&self, request: &Request) -> ShellCacheResult<FetchDisposition> {
        self.handle_fetch(request).await
    }

    async fn on_message(&self, payload: &str) -> ShellCacheResult<MessageOutcome> {
        self.handle_message(payload).await
    }
}
