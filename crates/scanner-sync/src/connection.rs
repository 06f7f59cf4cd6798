//! # Connection Controller
//!
//! Owns connectivity to the inventory server: the first connect, the bounded
//! reconnect loop, the active dataset and the background loops that run
//! while connected.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  connect(url)                                                           │
//! │    │                                                                    │
//! │    ├── cancel reconnect + poller                                        │
//! │    ├── state = Connecting                                               │
//! │    └── probe: ping ──► current_dataset                                  │
//! │          │                                                              │
//! │          ├── ok  ──► persist ServerConfig                               │
//! │          │           state = Connected                                  │
//! │          │           start poller, start drain                          │
//! │          │                                                              │
//! │          └── err ──► state = Disconnected                               │
//! │                      start reconnect loop                               │
//! │                                                                         │
//! │  reconnect loop: up to N attempts, fixed interval                       │
//! │    Reconnecting{1,N} ─wait─► probe ─► ... ─► Reconnecting{N,N}          │
//! │    ─wait─► probe ─► Disconnected (idle)                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Loop Ownership
//! The poller and the reconnect loop never run together: starting one cancels
//! the other. A loop that has been superseded may not write the status.

use backoff::backoff::{Backoff, Constant};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use scanner_core::validation::validate_server_url;
use scanner_core::{DatasetId, DatasetInfo, ProgressInfo, ServerConfig};

use crate::config::ScannerConfig;
use crate::engine::SyncEngine;
use crate::error::{GatewayResult, SyncError, SyncResult};
use crate::gateway::RemoteGateway;
use crate::status::{ConnectionState, NoOpEmitter, ScannerEventEmitter, ScannerStatus};
use crate::store::LocalStore;
use crate::tasks::{LoopSlot, LoopToken};

// =============================================================================
// Settings & Outcome
// =============================================================================

/// Timing knobs for the background loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        ControllerSettings {
            poll_interval: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(5),
            max_reconnect_attempts: 3,
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &ScannerConfig) -> Self {
        ControllerSettings {
            poll_interval: config.poll_interval(),
            reconnect_interval: config.reconnect_interval(),
            max_reconnect_attempts: config.sync.max_reconnect_attempts,
        }
    }
}

/// Result of a connect attempt, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    pub connected: bool,

    /// The server's current dataset, if it has one.
    pub dataset: Option<DatasetInfo>,

    pub message: Option<String>,
}

// =============================================================================
// Controller
// =============================================================================

pub(crate) struct ControllerInner {
    pub(crate) store: Arc<dyn LocalStore>,
    pub(crate) gateway: Arc<dyn RemoteGateway>,
    pub(crate) engine: SyncEngine,
    pub(crate) settings: ControllerSettings,
    pub(crate) status: Arc<RwLock<ScannerStatus>>,
    pub(crate) emitter: Arc<dyn ScannerEventEmitter>,
    pub(crate) reconnect: LoopSlot,
    pub(crate) poller: LoopSlot,
    pub(crate) drain: LoopSlot,
}

/// Connectivity state machine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ConnectionController {
    pub(crate) inner: Arc<ControllerInner>,
}

impl ConnectionController {
    /// Creates an idle, disconnected controller.
    pub fn new(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        engine: SyncEngine,
        settings: ControllerSettings,
    ) -> Self {
        Self::with_emitter(store, gateway, engine, settings, Arc::new(NoOpEmitter))
    }

    pub fn with_emitter(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        engine: SyncEngine,
        settings: ControllerSettings,
        emitter: Arc<dyn ScannerEventEmitter>,
    ) -> Self {
        ConnectionController {
            inner: Arc::new(ControllerInner {
                store,
                gateway,
                engine,
                settings,
                status: Arc::new(RwLock::new(ScannerStatus::default())),
                emitter,
                reconnect: LoopSlot::new("reconnect"),
                poller: LoopSlot::new("poller"),
                drain: LoopSlot::new("drain"),
            }),
        }
    }

    /// Current status snapshot.
    pub async fn status(&self) -> ScannerStatus {
        self.inner.status.read().await.clone()
    }

    pub async fn server_url(&self) -> Option<String> {
        self.inner.status.read().await.server_url.clone()
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.inner.settings
    }

    /// True while a reconnect loop is waiting or probing.
    pub fn is_reconnecting(&self) -> bool {
        self.inner.reconnect.is_running()
    }

    // =========================================================================
    // Connect
    // =========================================================================

    /// Connects to `raw_url`, falling back to the reconnect loop on failure.
    ///
    /// Server failures are reported in the outcome, never as `Err`.
    ///
    /// ## Errors
    /// - [`SyncError::Validation`] if the address is blank or malformed
    pub async fn connect(&self, raw_url: &str) -> SyncResult<ConnectOutcome> {
        let url = validate_server_url(raw_url)?;

        self.inner.reconnect.cancel();
        self.inner.poller.cancel();

        {
            let mut status = self.inner.status.write().await;
            status.state = ConnectionState::Connecting;
            status.server_url = Some(url.clone());
            self.inner.emitter.emit_status(&status);
        }

        info!(%url, "Connecting to server");

        match self.probe(&url).await {
            Ok(dataset) => {
                self.enter_connected(&url, dataset.clone(), None).await;
                let message = match &dataset {
                    Some(d) => format!("Connected. Active dataset: {}", d.name),
                    None => "Connected. Server has no active dataset.".to_string(),
                };
                Ok(ConnectOutcome {
                    connected: true,
                    dataset,
                    message: Some(message),
                })
            }
            Err(e) => {
                let message = format!("Cannot reach server: {e}");
                warn!(%url, error = %e, "Connect failed");
                if self.enter_disconnected(&message, None).await {
                    self.start_reconnect();
                }
                Ok(ConnectOutcome {
                    connected: false,
                    dataset: None,
                    message: Some(message),
                })
            }
        }
    }

    /// Re-runs connect against the current server.
    pub async fn refresh(&self) -> SyncResult<ConnectOutcome> {
        let url = self.server_url().await.ok_or(SyncError::NoServer)?;
        self.connect(&url).await
    }

    /// Restores the saved server and dataset and connects to it.
    ///
    /// When the server reports no current dataset, the saved one is
    /// re-activated. Returns `None` when nothing was saved.
    pub async fn resume(&self) -> SyncResult<Option<ConnectOutcome>> {
        let Some(saved) = self.inner.store.load_server_config().await? else {
            debug!("No saved server config");
            return Ok(None);
        };

        {
            let mut status = self.inner.status.write().await;
            status.server_url = Some(saved.server_url.clone());
            status.active_dataset_id = saved.active_dataset_id;
            status.active_dataset_name = saved.active_dataset_name.clone();
            status.last_connected = Some(saved.last_connected);
        }

        info!(
            url = %saved.server_url,
            dataset_id = ?saved.active_dataset_id,
            "Resuming saved server"
        );

        let outcome = self.connect(&saved.server_url).await?;

        // A server without a current dataset keeps the one activated earlier.
        if outcome.connected && outcome.dataset.is_none() {
            if let Some(dataset_id) = saved.active_dataset_id {
                self.restore_dataset(dataset_id).await;
            }
        }
        Ok(Some(outcome))
    }

    /// Re-activates a previously chosen dataset if the server still lists it.
    async fn restore_dataset(&self, dataset_id: DatasetId) {
        let datasets = match self.list_datasets().await {
            Ok(datasets) => datasets,
            Err(e) => {
                warn!(dataset_id, error = %e, "Cannot restore saved dataset");
                return;
            }
        };

        match datasets.into_iter().find(|d| d.id == dataset_id) {
            Some(dataset) => {
                if let Err(e) = self.activate_dataset(&dataset).await {
                    warn!(dataset_id, error = %e, "Cannot restore saved dataset");
                }
            }
            None => info!(dataset_id, "Saved dataset no longer on server"),
        }
    }

    async fn probe(&self, url: &str) -> GatewayResult<Option<DatasetInfo>> {
        self.inner.gateway.ping(url).await?;
        self.inner.gateway.current_dataset(url).await
    }

    /// Moves to `Connected`. Returns false if `token` went stale first.
    async fn enter_connected(
        &self,
        url: &str,
        dataset: Option<DatasetInfo>,
        token: Option<&LoopToken>,
    ) -> bool {
        if token.is_some_and(|t| !t.is_current()) {
            return false;
        }

        let now = Utc::now();
        let config = ServerConfig::new(url, dataset.as_ref(), now);
        if let Err(e) = self.inner.store.save_server_config(&config).await {
            error!(error = %e, "Failed to persist server config");
        }

        {
            let mut status = self.inner.status.write().await;
            if token.is_some_and(|t| !t.is_current()) {
                return false;
            }
            status.state = ConnectionState::Connected;
            status.server_url = Some(url.to_string());
            status.set_dataset(dataset.as_ref());
            status.last_connected = Some(now);
            status.last_error = None;
            self.inner.emitter.emit_status(&status);
        }

        info!(
            %url,
            dataset_id = ?dataset.as_ref().map(|d| d.id),
            "Connected to server"
        );

        self.start_poller();
        self.start_drain();
        true
    }

    /// Moves to `Disconnected`. Returns false if `token` went stale first.
    pub(crate) async fn enter_disconnected(&self, message: &str, token: Option<&LoopToken>) -> bool {
        let mut status = self.inner.status.write().await;
        if token.is_some_and(|t| !t.is_current()) {
            return false;
        }
        status.state = ConnectionState::Disconnected;
        status.last_error = Some(message.to_string());
        self.inner.emitter.emit_status(&status);
        self.inner.emitter.emit_error(message, true);
        true
    }

    /// Sets the state only if `token` is still current.
    async fn set_state(&self, state: ConnectionState, token: &LoopToken) -> bool {
        let mut status = self.inner.status.write().await;
        if !token.is_current() {
            return false;
        }
        status.state = state;
        self.inner.emitter.emit_status(&status);
        true
    }

    // =========================================================================
    // Reconnect Loop
    // =========================================================================

    /// Starts a fresh reconnect loop, replacing any earlier one.
    pub(crate) fn start_reconnect(&self) {
        if self.inner.settings.max_reconnect_attempts == 0 {
            return;
        }
        self.inner.poller.cancel();
        let this = self.clone();
        self.inner
            .reconnect
            .spawn(move |token| this.reconnect_loop(token));
    }

    async fn reconnect_loop(self, token: LoopToken) {
        let max_attempts = self.inner.settings.max_reconnect_attempts;
        let interval = self.inner.settings.reconnect_interval;
        let mut policy = Constant::new(interval);

        for attempt in 1..=max_attempts {
            let state = ConnectionState::Reconnecting {
                attempt,
                max_attempts,
            };
            if !self.set_state(state, &token).await {
                return;
            }

            tokio::time::sleep(policy.next_backoff().unwrap_or(interval)).await;
            if !token.is_current() {
                return;
            }

            let Some(url) = self.server_url().await else {
                warn!("Reconnect loop has no server url");
                break;
            };

            debug!(attempt, max_attempts, %url, "Reconnect attempt");
            match self.probe(&url).await {
                Ok(dataset) => {
                    if self.enter_connected(&url, dataset, Some(&token)).await {
                        info!(attempt, "Reconnected");
                    }
                    return;
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Reconnect attempt failed");
                    let mut status = self.inner.status.write().await;
                    if token.is_current() {
                        status.last_error = Some(format!("Cannot reach server: {e}"));
                    }
                }
            }
        }

        let message = format!("Server unreachable after {max_attempts} attempts");
        let mut status = self.inner.status.write().await;
        if token.is_current() {
            status.state = ConnectionState::Disconnected;
            status.last_error = Some(message.clone());
            self.inner.emitter.emit_status(&status);
            self.inner.emitter.emit_error(&message, false);
            info!(max_attempts, "Reconnect attempts exhausted");
        }
    }

    // =========================================================================
    // Drain
    // =========================================================================

    /// Uploads the pending queue in the background.
    pub(crate) fn start_drain(&self) {
        let this = self.clone();
        self.inner.drain.spawn(move |token| this.drain_once(token));
    }

    async fn drain_once(self, token: LoopToken) {
        let Some(url) = self.server_url().await else {
            return;
        };

        match self.inner.engine.drain(&url).await {
            Ok(report) => {
                if let Some(halt) = report.halted {
                    if token.is_current() {
                        let message = format!(
                            "Upload of {} failed: {}",
                            halt.box_number, halt.error
                        );
                        self.report_failure(&message).await;
                    }
                }
            }
            Err(e) => error!(error = %e, "Pending upload failed"),
        }
    }

    /// Demotes to `Disconnected` and starts reconnecting, unless a
    /// reconnect loop is already running.
    pub async fn report_failure(&self, message: &str) {
        if self.inner.reconnect.is_running() {
            let mut status = self.inner.status.write().await;
            status.last_error = Some(message.to_string());
            return;
        }

        warn!(error = message, "Server failure, reconnecting");
        self.inner.poller.cancel();
        if self.enter_disconnected(message, None).await {
            self.start_reconnect();
        }
    }

    // =========================================================================
    // Datasets
    // =========================================================================

    /// Lists the datasets on the current server.
    pub async fn list_datasets(&self) -> SyncResult<Vec<DatasetInfo>> {
        let url = self.server_url().await.ok_or(SyncError::NoServer)?;
        Ok(self.inner.gateway.list_datasets(&url).await?)
    }

    /// Makes `dataset` the active one and saves it against the current server.
    ///
    /// Connectivity is not touched, and neither is `last_connected`.
    ///
    /// ## Errors
    /// - [`SyncError::NoServer`] if no server is known yet
    pub async fn activate_dataset(&self, dataset: &DatasetInfo) -> SyncResult<()> {
        let (url, last_connected) = {
            let status = self.inner.status.read().await;
            let url = status.server_url.clone().ok_or(SyncError::NoServer)?;
            (url, status.last_connected)
        };

        let config =
            ServerConfig::new(&url, Some(dataset), last_connected.unwrap_or_else(Utc::now));
        self.inner.store.save_server_config(&config).await?;

        let progress = ProgressInfo::from_dataset(dataset);
        {
            let mut status = self.inner.status.write().await;
            status.set_dataset(Some(dataset));
            self.inner.emitter.emit_status(&status);
        }
        self.inner.emitter.emit_progress(&progress);

        info!(dataset_id = dataset.id, name = %dataset.name, "Dataset activated");
        Ok(())
    }

    /// Stores progress reported alongside a scan for the active dataset.
    pub async fn record_progress(&self, dataset_id: DatasetId, progress: ProgressInfo) {
        let mut status = self.inner.status.write().await;
        if status.active_dataset_id == Some(dataset_id) {
            status.progress = Some(progress);
            self.inner.emitter.emit_progress(&progress);
        }
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops every background loop and marks the controller disconnected.
    pub async fn shutdown(&self) {
        self.inner.reconnect.cancel();
        self.inner.poller.cancel();
        self.inner.drain.cancel();

        let mut status = self.inner.status.write().await;
        status.state = ConnectionState::Disconnected;
        self.inner.emitter.emit_status(&status);
        info!("Connection controller stopped");
    }
}
