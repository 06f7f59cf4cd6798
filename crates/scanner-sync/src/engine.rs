//! # Sync Engine
//!
//! Scan submission and the pending-upload queue.
//!
//! ## Submit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit_scan(url, dataset, code)                                        │
//! │                                                                         │
//! │  validate code ──► POST api/scan ──┬── 2xx ──► record(uploaded = true)  │
//! │                                    │           outcome from response    │
//! │                                    │                                    │
//! │                                    └── err ──► record(uploaded = false) │
//! │                                                outcome = Error          │
//! │                                                                         │
//! │  Exactly one record is appended per accepted code, whatever happens.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Drain
//! ```text
//!  pending (oldest first): A ─► B ─► C
//!                          ok   fail
//!                          │     └──► stop; B and C stay pending
//!                          └──► mark A uploaded
//! ```
//! Each record is replayed under its own `dataset_id`, not the one currently
//! active. Drains are serialized so two callers never upload the same record.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use scanner_core::validation::validate_box_code;
use scanner_core::{DatasetId, NewScanRecord, RecordId, ScanOutcome, ScanRecord};

use crate::error::{GatewayError, SyncResult};
use crate::gateway::RemoteGateway;
use crate::protocol::{ScanRequest, ScanResponse};
use crate::store::LocalStore;

/// What happened to one submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub outcome: ScanOutcome,

    /// The record appended for this scan.
    pub record: ScanRecord,

    /// Server response, when the server answered.
    pub response: Option<ScanResponse>,

    /// Why the scan was queued instead of confirmed.
    pub error: Option<GatewayError>,
}

impl ScanResult {
    /// True when the record still has to be uploaded.
    pub fn is_queued(&self) -> bool {
        self.record.is_pending()
    }

    /// Human-readable line for the scan feed.
    pub fn message(&self) -> String {
        let code = &self.record.box_number;
        match self.outcome {
            ScanOutcome::FoundFirstTime => match &self.record.zone {
                Some(zone) => format!("{code}: found (zone {zone})"),
                None => format!("{code}: found"),
            },
            ScanOutcome::FoundDuplicate => format!("{code}: already scanned"),
            ScanOutcome::NotFound => format!("{code}: not in dataset"),
            ScanOutcome::Error => match &self.error {
                Some(err) => format!("{code}: saved offline ({err})"),
                None => format!("{code}: saved offline"),
            },
        }
    }
}

/// Where a drain stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainHalt {
    pub record_id: RecordId,
    pub box_number: String,
    pub error: GatewayError,
}

/// Summary of one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records acknowledged by the server during this drain.
    pub uploaded: usize,

    /// Set when the drain stopped before emptying the queue.
    pub halted: Option<DrainHalt>,
}

impl DrainReport {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Submits scans and replays the pending queue.
#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn RemoteGateway>,
    device_id: String,
    drain_lock: Arc<Mutex<()>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        device_id: impl Into<String>,
    ) -> Self {
        SyncEngine {
            store,
            gateway,
            device_id: device_id.into(),
            drain_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Submits one scanned code and records the result locally.
    ///
    /// ## Errors
    /// - [`crate::SyncError::Validation`] for a blank code (nothing is appended)
    /// - [`crate::SyncError::Database`] if the record cannot be appended
    ///
    /// A server failure is not an error: the scan is queued and the result
    /// carries [`ScanOutcome::Error`].
    pub async fn submit_scan(
        &self,
        base_url: &str,
        dataset_id: DatasetId,
        box_code: &str,
    ) -> SyncResult<ScanResult> {
        let box_number = validate_box_code(box_code)?;
        let scanned_at = Utc::now();
        let request = ScanRequest {
            dataset_id,
            box_number: box_number.clone(),
            device_id: self.device_id.clone(),
        };

        match self.gateway.submit_scan(base_url, &request).await {
            Ok(response) => {
                let outcome = response.outcome();
                let record = NewScanRecord {
                    box_number,
                    zone: response.zone.clone(),
                    store_address: response.store_address.clone(),
                    first_scan: response.first_scan.unwrap_or(true),
                    found: response.is_found(),
                    dataset_id,
                    scanned_at,
                    uploaded: true,
                };
                let record = self.store.append_record(record).await?;

                debug!(
                    box_number = %record.box_number,
                    dataset_id,
                    %outcome,
                    "Scan confirmed"
                );

                Ok(ScanResult {
                    outcome,
                    record,
                    response: Some(response),
                    error: None,
                })
            }
            Err(error) => {
                let record = self
                    .store
                    .append_record(NewScanRecord::pending(dataset_id, box_number, scanned_at))
                    .await?;

                warn!(
                    box_number = %record.box_number,
                    dataset_id,
                    error = %error,
                    "Scan submission failed, queued for upload"
                );

                Ok(ScanResult {
                    outcome: ScanOutcome::Error,
                    record,
                    response: None,
                    error: Some(error),
                })
            }
        }
    }

    /// Replays pending records oldest first, stopping at the first failure.
    pub async fn drain(&self, base_url: &str) -> SyncResult<DrainReport> {
        let _guard = self.drain_lock.lock().await;

        let pending = self.store.pending_records().await?;
        if pending.is_empty() {
            debug!("No pending records");
            return Ok(DrainReport::default());
        }

        info!(count = pending.len(), "Uploading pending records");

        let mut report = DrainReport::default();
        for record in pending {
            let request = ScanRequest {
                dataset_id: record.dataset_id,
                box_number: record.box_number.clone(),
                device_id: self.device_id.clone(),
            };

            match self.gateway.submit_scan(base_url, &request).await {
                Ok(_) => {
                    self.store.mark_uploaded(record.id).await?;
                    report.uploaded += 1;
                }
                Err(error) => {
                    warn!(
                        record_id = record.id,
                        box_number = %record.box_number,
                        uploaded = report.uploaded,
                        error = %error,
                        "Pending upload halted"
                    );
                    report.halted = Some(DrainHalt {
                        record_id: record.id,
                        box_number: record.box_number,
                        error,
                    });
                    return Ok(report);
                }
            }
        }

        info!(uploaded = report.uploaded, "Pending records uploaded");
        Ok(report)
    }

    /// Drains the queue and returns how many records were uploaded.
    pub async fn upload_pending_records(&self, base_url: &str) -> SyncResult<usize> {
        Ok(self.drain(base_url).await?.uploaded)
    }
}
