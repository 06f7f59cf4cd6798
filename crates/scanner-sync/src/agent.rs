//! # Scanner Agent
//!
//! Composition root for the scanner client: wires config, store, gateway,
//! controller and engine together and exposes the operations a UI needs.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ScannerAgent Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                        ScannerAgent                              │  │
//! │  │                                                                  │  │
//! │  │  • start(): resume saved server, else the configured one         │  │
//! │  │  • scan(code): submit against current server + dataset           │  │
//! │  │  • status / live record views                                    │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  Connection    │  │  SyncEngine    │  │  LocalStore            │    │
//! │  │  Controller    │  │                │  │                        │    │
//! │  │  reconnect,    │  │  submit scan,  │  │  scan records,         │    │
//! │  │  poller, drain │  │  drain queue   │  │  server config         │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{info, warn};

use scanner_core::{DatasetId, DatasetInfo, RecordFilter, ScanOutcome, ScanRecord, ServerConfig};
use scanner_db::{Database, DbConfig};

use crate::config::ScannerConfig;
use crate::connection::{ConnectOutcome, ConnectionController, ControllerSettings};
use crate::engine::{DrainReport, ScanResult, SyncEngine};
use crate::error::{SyncError, SyncResult};
use crate::gateway::{HttpGateway, RemoteGateway};
use crate::live::{self, LiveQuery};
use crate::protocol::RemoteScan;
use crate::status::{NoOpEmitter, ScannerEventEmitter, ScannerStatus};
use crate::store::LocalStore;

/// Main entry point for the scanner client.
pub struct ScannerAgent {
    config: Arc<ScannerConfig>,
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn RemoteGateway>,
    controller: ConnectionController,
    engine: SyncEngine,
}

impl ScannerAgent {
    /// Creates an agent over the given store and gateway.
    pub fn new(
        config: ScannerConfig,
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
    ) -> Self {
        Self::with_emitter(config, store, gateway, Arc::new(NoOpEmitter))
    }

    /// Creates an agent with a custom event emitter.
    pub fn with_emitter(
        config: ScannerConfig,
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        emitter: Arc<dyn ScannerEventEmitter>,
    ) -> Self {
        let engine = SyncEngine::new(store.clone(), gateway.clone(), config.device_id());
        let controller = ConnectionController::with_emitter(
            store.clone(),
            gateway.clone(),
            engine.clone(),
            ControllerSettings::from_config(&config),
            emitter,
        );

        ScannerAgent {
            config: Arc::new(config),
            store,
            gateway,
            controller,
            engine,
        }
    }

    /// Opens the SQLite store and HTTP gateway described by `config`.
    pub async fn open(config: ScannerConfig) -> SyncResult<Self> {
        Self::open_with_emitter(config, Arc::new(NoOpEmitter)).await
    }

    /// Like [`ScannerAgent::open`], with a custom event emitter.
    pub async fn open_with_emitter(
        config: ScannerConfig,
        emitter: Arc<dyn ScannerEventEmitter>,
    ) -> SyncResult<Self> {
        config.validate()?;

        let db = Database::new(DbConfig::new(config.database_path())).await?;
        let gateway = HttpGateway::from_config(&config)?;

        info!(
            device_id = config.device_id(),
            db = %config.database_path().display(),
            "Scanner agent opened"
        );

        Ok(Self::with_emitter(
            config,
            Arc::new(db),
            Arc::new(gateway),
            emitter,
        ))
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn controller(&self) -> &ConnectionController {
        &self.controller
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Resumes the saved server, or connects to the configured one.
    ///
    /// Returns `None` when there is nothing to connect to yet.
    pub async fn start(&self) -> SyncResult<Option<ConnectOutcome>> {
        if let Some(outcome) = self.controller.resume().await? {
            return Ok(Some(outcome));
        }

        match self.config.server_url() {
            Some(url) => {
                info!(%url, "Connecting to configured server");
                self.controller.connect(url).await.map(Some)
            }
            None => {
                info!("No server configured, waiting for connect");
                Ok(None)
            }
        }
    }

    pub async fn connect(&self, url: &str) -> SyncResult<ConnectOutcome> {
        self.controller.connect(url).await
    }

    pub async fn refresh(&self) -> SyncResult<ConnectOutcome> {
        self.controller.refresh().await
    }

    // =========================================================================
    // Datasets
    // =========================================================================

    pub async fn list_datasets(&self) -> SyncResult<Vec<DatasetInfo>> {
        self.controller.list_datasets().await
    }

    pub async fn activate_dataset(&self, dataset: &DatasetInfo) -> SyncResult<()> {
        self.controller.activate_dataset(dataset).await
    }

    /// Activates a dataset by id, looking it up on the server.
    ///
    /// ## Errors
    /// - [`SyncError::UnknownDataset`] if the server does not list it
    pub async fn activate_dataset_id(&self, dataset_id: DatasetId) -> SyncResult<DatasetInfo> {
        let dataset = self
            .list_datasets()
            .await?
            .into_iter()
            .find(|d| d.id == dataset_id)
            .ok_or(SyncError::UnknownDataset(dataset_id))?;

        self.activate_dataset(&dataset).await?;
        Ok(dataset)
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Submits a scanned code against the current server and dataset.
    ///
    /// A failed submission is queued and demotes the connection.
    ///
    /// ## Errors
    /// - [`SyncError::NoServer`] / [`SyncError::NoActiveDataset`] when unset
    /// - [`SyncError::Validation`] for a blank code
    pub async fn scan(&self, code: &str) -> SyncResult<ScanResult> {
        let status = self.controller.status().await;
        let url = status.server_url.ok_or(SyncError::NoServer)?;
        let dataset_id = status.active_dataset_id.ok_or(SyncError::NoActiveDataset)?;

        let result = self.engine.submit_scan(&url, dataset_id, code).await?;

        if result.outcome == ScanOutcome::Error {
            self.controller.report_failure(&result.message()).await;
        } else if let Some(progress) = result.response.as_ref().and_then(|r| r.progress) {
            self.controller.record_progress(dataset_id, progress).await;
        }

        Ok(result)
    }

    /// Uploads pending records now.
    pub async fn sync_now(&self) -> SyncResult<DrainReport> {
        let url = self.controller.server_url().await.ok_or(SyncError::NoServer)?;
        let report = self.engine.drain(&url).await?;

        if let Some(halt) = &report.halted {
            let message = format!("Upload of {} failed: {}", halt.box_number, halt.error);
            self.controller.report_failure(&message).await;
        }
        Ok(report)
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Status snapshot including the pending count.
    pub async fn status(&self) -> ScannerStatus {
        let mut status = self.controller.status().await;
        match self.store.pending_count().await {
            Ok(count) => status.pending_count = count,
            Err(e) => warn!(error = %e, "Failed to count pending records"),
        }
        status
    }

    /// Records of the active dataset.
    pub async fn records(&self, filter: RecordFilter) -> SyncResult<Vec<ScanRecord>> {
        let dataset_id = self.active_dataset().await?;
        Ok(self
            .store
            .filtered_records(dataset_id, filter, self.config.sync.recent_limit)
            .await?)
    }

    /// Live view of the active dataset's records.
    pub async fn records_stream(
        &self,
        filter: RecordFilter,
    ) -> SyncResult<LiveQuery<Vec<ScanRecord>>> {
        let dataset_id = self.active_dataset().await?;
        Ok(live::records(
            self.store.clone(),
            dataset_id,
            filter,
            self.config.sync.recent_limit,
        ))
    }

    /// Live count of records waiting for upload.
    pub fn pending_count_stream(&self) -> LiveQuery<i64> {
        live::pending_count(self.store.clone())
    }

    /// Live view of the saved server and dataset.
    pub fn server_config_stream(&self) -> LiveQuery<Option<ServerConfig>> {
        live::server_config(self.store.clone())
    }

    /// Latest scans the server has recorded, from any device.
    pub async fn recent_remote_scans(&self, limit: u32) -> SyncResult<Vec<RemoteScan>> {
        let url = self.controller.server_url().await.ok_or(SyncError::NoServer)?;
        Ok(self.gateway.recent_scans(&url, limit).await?)
    }

    /// Deletes the cached records of a dataset.
    pub async fn clear_dataset(&self, dataset_id: DatasetId) -> SyncResult<u64> {
        let removed = self.store.delete_dataset_records(dataset_id).await?;
        info!(dataset_id, removed, "Cleared dataset records");
        Ok(removed)
    }

    /// Stops background loops.
    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }

    async fn active_dataset(&self) -> SyncResult<DatasetId> {
        self.controller
            .status()
            .await
            .active_dataset_id
            .ok_or(SyncError::NoActiveDataset)
    }
}
