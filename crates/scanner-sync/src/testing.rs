//! In-memory store and scripted gateway for controller and engine tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use scanner_core::{
    DatasetId, DatasetInfo, NewScanRecord, ProgressInfo, RecordId, ScanRecord, ServerConfig,
};
use scanner_db::DbResult;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::RemoteGateway;
use crate::protocol::{PingResponse, RemoteScan, ScanRequest, ScanResponse};
use crate::status::{ScannerEventEmitter, ScannerStatus};
use crate::store::LocalStore;

pub fn dataset(id: DatasetId, name: &str, scanned: i64, total: i64) -> DatasetInfo {
    DatasetInfo {
        id,
        name: name.to_string(),
        file_name: None,
        total_count: total,
        scanned_count: scanned,
        is_current: Some(1),
        created_at: None,
    }
}

fn offline() -> GatewayError {
    GatewayError::Network("connection refused".into())
}

// =============================================================================
// Memory Store
// =============================================================================

#[derive(Default)]
struct StoreInner {
    records: Vec<ScanRecord>,
    next_id: RecordId,
    config: Option<ServerConfig>,
}

pub struct MemoryStore {
    inner: Mutex<StoreInner>,
    changes: watch::Sender<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        MemoryStore {
            inner: Mutex::new(StoreInner::default()),
            changes,
        }
    }

    pub fn records(&self) -> Vec<ScanRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    pub fn config(&self) -> Option<ServerConfig> {
        self.inner.lock().unwrap().config.clone()
    }

    fn bump(&self) {
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn append_record(&self, record: NewScanRecord) -> DbResult<ScanRecord> {
        let saved = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_id += 1;
            let saved = record.with_id(inner.next_id);
            inner.records.push(saved.clone());
            saved
        };
        self.bump();
        Ok(saved)
    }

    async fn recent_records(&self, dataset_id: DatasetId, limit: u32) -> DbResult<Vec<ScanRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .rev()
            .filter(|r| r.dataset_id == dataset_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn records_by_found(
        &self,
        dataset_id: DatasetId,
        found: bool,
    ) -> DbResult<Vec<ScanRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .rev()
            .filter(|r| r.dataset_id == dataset_id && r.found == found)
            .cloned()
            .collect())
    }

    async fn pending_records(&self) -> DbResult<Vec<ScanRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.iter().filter(|r| !r.uploaded).cloned().collect())
    }

    async fn pending_count(&self) -> DbResult<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.iter().filter(|r| !r.uploaded).count() as i64)
    }

    async fn mark_uploaded(&self, id: RecordId) -> DbResult<bool> {
        let updated = {
            let mut inner = self.inner.lock().unwrap();
            match inner.records.iter_mut().find(|r| r.id == id) {
                Some(record) => {
                    record.uploaded = true;
                    true
                }
                None => false,
            }
        };
        if updated {
            self.bump();
        }
        Ok(updated)
    }

    async fn delete_dataset_records(&self, dataset_id: DatasetId) -> DbResult<u64> {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            let before = inner.records.len();
            inner.records.retain(|r| r.dataset_id != dataset_id);
            (before - inner.records.len()) as u64
        };
        self.bump();
        Ok(removed)
    }

    async fn load_server_config(&self) -> DbResult<Option<ServerConfig>> {
        Ok(self.config())
    }

    async fn save_server_config(&self, config: &ServerConfig) -> DbResult<()> {
        self.inner.lock().unwrap().config = Some(config.clone());
        self.bump();
        Ok(())
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

// =============================================================================
// Mock Gateway
// =============================================================================

#[derive(Default)]
struct GatewayInner {
    offline: bool,
    progress_offline: bool,
    current: Option<DatasetInfo>,
    current_error: Option<GatewayError>,
    datasets: Vec<DatasetInfo>,
    failing_boxes: HashSet<String>,
    responses: HashMap<String, ScanResponse>,
    progress: ProgressInfo,
    pings: usize,
    progress_calls: usize,
    submitted: Vec<ScanRequest>,
}

/// Gateway whose answers are scripted by the test.
#[derive(Clone, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<GatewayInner>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a network error while offline.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    pub fn set_progress_offline(&self, offline: bool) {
        self.inner.lock().unwrap().progress_offline = offline;
    }

    pub fn set_current_dataset(&self, dataset: Option<DatasetInfo>) {
        self.inner.lock().unwrap().current = dataset;
    }

    /// `current_dataset` fails with `error` while ping still succeeds.
    pub fn set_current_dataset_error(&self, error: Option<GatewayError>) {
        self.inner.lock().unwrap().current_error = error;
    }

    pub fn set_datasets(&self, datasets: Vec<DatasetInfo>) {
        self.inner.lock().unwrap().datasets = datasets;
    }

    pub fn set_progress(&self, progress: ProgressInfo) {
        self.inner.lock().unwrap().progress = progress;
    }

    /// Scans of `box_number` fail until [`MockGateway::heal_box`].
    pub fn fail_box(&self, box_number: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_boxes
            .insert(box_number.to_string());
    }

    pub fn heal_box(&self, box_number: &str) {
        self.inner.lock().unwrap().failing_boxes.remove(box_number);
    }

    pub fn set_scan_response(&self, box_number: &str, response: ScanResponse) {
        self.inner
            .lock()
            .unwrap()
            .responses
            .insert(box_number.to_string(), response);
    }

    pub fn ping_count(&self) -> usize {
        self.inner.lock().unwrap().pings
    }

    pub fn progress_count(&self) -> usize {
        self.inner.lock().unwrap().progress_calls
    }

    pub fn submitted(&self) -> Vec<ScanRequest> {
        self.inner.lock().unwrap().submitted.clone()
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn ping(&self, _base_url: &str) -> GatewayResult<PingResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.pings += 1;
        if inner.offline {
            return Err(offline());
        }
        Ok(PingResponse {
            status: "ok".into(),
            message: Some("connected".into()),
        })
    }

    async fn current_dataset(&self, _base_url: &str) -> GatewayResult<Option<DatasetInfo>> {
        let inner = self.inner.lock().unwrap();
        if inner.offline {
            return Err(offline());
        }
        if let Some(error) = &inner.current_error {
            return Err(error.clone());
        }
        Ok(inner.current.clone())
    }

    async fn list_datasets(&self, _base_url: &str) -> GatewayResult<Vec<DatasetInfo>> {
        let inner = self.inner.lock().unwrap();
        if inner.offline {
            return Err(offline());
        }
        Ok(inner.datasets.clone())
    }

    async fn submit_scan(
        &self,
        _base_url: &str,
        request: &ScanRequest,
    ) -> GatewayResult<ScanResponse> {
        let mut inner = self.inner.lock().unwrap();
        if inner.offline || inner.failing_boxes.contains(&request.box_number) {
            return Err(offline());
        }
        inner.submitted.push(request.clone());
        Ok(inner
            .responses
            .get(&request.box_number)
            .cloned()
            .unwrap_or_else(|| ScanResponse {
                status: "found".into(),
                box_number: Some(request.box_number.clone()),
                zone: Some("A1".into()),
                store_address: Some("Store 1".into()),
                first_scan: Some(true),
                progress: None,
                message: None,
            }))
    }

    async fn progress(&self, _base_url: &str, _dataset_id: DatasetId) -> GatewayResult<ProgressInfo> {
        let mut inner = self.inner.lock().unwrap();
        inner.progress_calls += 1;
        if inner.offline || inner.progress_offline {
            return Err(offline());
        }
        Ok(inner.progress)
    }

    async fn recent_scans(&self, _base_url: &str, limit: u32) -> GatewayResult<Vec<RemoteScan>> {
        let inner = self.inner.lock().unwrap();
        if inner.offline {
            return Err(offline());
        }
        Ok(inner
            .submitted
            .iter()
            .rev()
            .take(limit as usize)
            .map(|r| RemoteScan {
                box_number: r.box_number.clone(),
                zone: None,
                store_address: None,
                scanned_at: None,
                first_scan: None,
            })
            .collect())
    }
}

// =============================================================================
// Recording Emitter
// =============================================================================

/// Emitter that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingEmitter {
    pub statuses: Mutex<Vec<ScannerStatus>>,
    pub progress: Mutex<Vec<ProgressInfo>>,
    pub errors: Mutex<Vec<(String, bool)>>,
}

impl ScannerEventEmitter for RecordingEmitter {
    fn emit_status(&self, status: &ScannerStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn emit_progress(&self, progress: &ProgressInfo) {
        self.progress.lock().unwrap().push(*progress);
    }

    fn emit_error(&self, message: &str, retryable: bool) {
        self.errors
            .lock()
            .unwrap()
            .push((message.to_string(), retryable));
    }
}
