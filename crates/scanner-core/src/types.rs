//! # Domain Types
//!
//! Core domain types used throughout the scanner client.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ScanRecord    │   │  ServerConfig   │   │  DatasetInfo    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (local)     │   │  id = 1 always  │   │  id / name      │       │
//! │  │  box_number     │   │  server_url     │   │  total_count    │       │
//! │  │  found          │   │  active dataset │   │  scanned_count  │       │
//! │  │  uploaded       │   │  last_connected │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  ProgressInfo   │   │   ScanOutcome   │   │  RecordFilter   │       │
//! │  │  scanned/total  │   │  FoundFirstTime │   │  All            │       │
//! │  │  percentage     │   │  FoundDuplicate │   │  Found          │       │
//! │  └─────────────────┘   │  NotFound/Error │   │  NotFound       │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pending Records
//! A [`ScanRecord`] with `uploaded == false` is a scan the server has not yet
//! acknowledged. It is replayed later, in capture order, under its own
//! `dataset_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Server-side dataset identifier.
pub type DatasetId = i64;

/// Local scan record identifier (insertion order).
pub type RecordId = i64;

// =============================================================================
// Scan Record
// =============================================================================

/// One scan attempt, as cached on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Local identifier, assigned monotonically by the store.
    pub id: RecordId,

    /// The scanned box code.
    pub box_number: String,

    /// Zone reported by the server (if the box was found).
    pub zone: Option<String>,

    /// Store address / location label reported by the server.
    pub store_address: Option<String>,

    /// True unless the server reported the box as already scanned.
    pub first_scan: bool,

    /// Whether the server found the box in the dataset.
    pub found: bool,

    /// Dataset this scan belongs to.
    pub dataset_id: DatasetId,

    /// When the scan was captured on the device.
    pub scanned_at: DateTime<Utc>,

    /// Whether the server has acknowledged this scan.
    pub uploaded: bool,
}

impl ScanRecord {
    /// Returns true if this record still has to be replayed to the server.
    pub fn is_pending(&self) -> bool {
        !self.uploaded
    }

    /// Returns true if this is a found box that had already been scanned.
    pub fn is_duplicate(&self) -> bool {
        self.found && !self.first_scan
    }
}

/// A scan record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScanRecord {
    pub box_number: String,
    pub zone: Option<String>,
    pub store_address: Option<String>,
    pub first_scan: bool,
    pub found: bool,
    pub dataset_id: DatasetId,
    pub scanned_at: DateTime<Utc>,
    pub uploaded: bool,
}

impl NewScanRecord {
    /// Builds the record cached when the submission itself failed.
    ///
    /// Only the box code and dataset are known. `found` is optimistic so the
    /// scan is not shown as an error before the server has seen it.
    pub fn pending(
        dataset_id: DatasetId,
        box_number: impl Into<String>,
        scanned_at: DateTime<Utc>,
    ) -> Self {
        NewScanRecord {
            box_number: box_number.into(),
            zone: None,
            store_address: None,
            first_scan: true,
            found: true,
            dataset_id,
            scanned_at,
            uploaded: false,
        }
    }

    /// Attaches the store-assigned id.
    pub fn with_id(self, id: RecordId) -> ScanRecord {
        ScanRecord {
            id,
            box_number: self.box_number,
            zone: self.zone,
            store_address: self.store_address,
            first_scan: self.first_scan,
            found: self.found,
            dataset_id: self.dataset_id,
            scanned_at: self.scanned_at,
            uploaded: self.uploaded,
        }
    }
}

// =============================================================================
// Server Config
// =============================================================================

/// The single persisted server connection record.
///
/// There is at most one of these; every write replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Normalized server base URL.
    pub server_url: String,

    /// Dataset the device is scanning against, if any.
    pub active_dataset_id: Option<DatasetId>,

    /// Display name of the active dataset.
    pub active_dataset_name: Option<String>,

    /// Last time a connectivity test succeeded.
    pub last_connected: DateTime<Utc>,
}

impl ServerConfig {
    /// Creates a config pointing at `server_url` with an optional dataset.
    pub fn new(
        server_url: impl Into<String>,
        dataset: Option<&DatasetInfo>,
        last_connected: DateTime<Utc>,
    ) -> Self {
        ServerConfig {
            server_url: server_url.into(),
            active_dataset_id: dataset.map(|d| d.id),
            active_dataset_name: dataset.map(|d| d.name.clone()),
            last_connected,
        }
    }
}

// =============================================================================
// Dataset & Progress (server projections)
// =============================================================================

/// A dataset as described by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: DatasetId,

    pub name: String,

    #[serde(default)]
    pub file_name: Option<String>,

    #[serde(default)]
    pub total_count: i64,

    #[serde(default)]
    pub scanned_count: i64,

    /// Server-side "current" flag (0/1).
    #[serde(default)]
    pub is_current: Option<i64>,

    #[serde(default)]
    pub created_at: Option<String>,
}

impl DatasetInfo {
    /// Progress derived from this dataset's own counters.
    pub fn progress(&self) -> ProgressInfo {
        ProgressInfo::from_counts(self.scanned_count, self.total_count)
    }
}

/// Scan progress for a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub scanned: i64,
    pub total: i64,
    pub percentage: i64,
}

impl ProgressInfo {
    /// Computes progress with integer percentage (0 when total is 0).
    pub fn from_counts(scanned: i64, total: i64) -> Self {
        let percentage = if total > 0 { scanned * 100 / total } else { 0 };
        ProgressInfo {
            scanned,
            total,
            percentage,
        }
    }

    /// Seeds progress from a dataset (used right after activation).
    pub fn from_dataset(dataset: &DatasetInfo) -> Self {
        dataset.progress()
    }

    /// Returns true when every expected item has been scanned.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.scanned >= self.total
    }
}

// =============================================================================
// Scan Outcome
// =============================================================================

/// How a single scan was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Box is in the dataset and this is its first scan.
    FoundFirstTime,
    /// Box is in the dataset but was scanned before.
    FoundDuplicate,
    /// Box is not part of the dataset.
    NotFound,
    /// The submission failed; the scan was queued locally.
    Error,
}

impl ScanOutcome {
    /// Classifies a server response by its `status` and `first_scan` fields.
    ///
    /// Statuses other than `"found"` count as not found.
    pub fn classify(status: &str, first_scan: Option<bool>) -> Self {
        match (status, first_scan) {
            ("found", Some(false)) => ScanOutcome::FoundDuplicate,
            ("found", _) => ScanOutcome::FoundFirstTime,
            _ => ScanOutcome::NotFound,
        }
    }

    /// Returns true if the server found the box.
    pub fn is_found(&self) -> bool {
        matches!(self, ScanOutcome::FoundFirstTime | ScanOutcome::FoundDuplicate)
    }
}

impl std::fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanOutcome::FoundFirstTime => write!(f, "found"),
            ScanOutcome::FoundDuplicate => write!(f, "duplicate"),
            ScanOutcome::NotFound => write!(f, "not_found"),
            ScanOutcome::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Record Filter
// =============================================================================

/// Which cached records a list view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFilter {
    /// Most recent records, capped at the recent limit.
    #[default]
    All,
    /// Only records the server found.
    Found,
    /// Only records the server did not find.
    NotFound,
}

impl std::fmt::Display for RecordFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFilter::All => write!(f, "all"),
            RecordFilter::Found => write!(f, "found"),
            RecordFilter::NotFound => write!(f, "not_found"),
        }
    }
}

impl std::str::FromStr for RecordFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "recent" => Ok(RecordFilter::All),
            "found" | "success" => Ok(RecordFilter::Found),
            "not_found" | "not-found" | "error" => Ok(RecordFilter::NotFound),
            other => Err(CoreError::UnknownFilter(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(scanned: i64, total: i64) -> DatasetInfo {
        DatasetInfo {
            id: 7,
            name: "Shipment 7".into(),
            file_name: None,
            total_count: total,
            scanned_count: scanned,
            is_current: Some(1),
            created_at: None,
        }
    }

    #[test]
    fn test_classify_scan_status() {
        assert_eq!(ScanOutcome::classify("found", Some(true)), ScanOutcome::FoundFirstTime);
        assert_eq!(ScanOutcome::classify("found", None), ScanOutcome::FoundFirstTime);
        assert_eq!(ScanOutcome::classify("found", Some(false)), ScanOutcome::FoundDuplicate);
        assert_eq!(ScanOutcome::classify("not_found", None), ScanOutcome::NotFound);
        assert_eq!(ScanOutcome::classify("weird", Some(true)), ScanOutcome::NotFound);
    }

    #[test]
    fn test_progress_from_dataset() {
        let p = ProgressInfo::from_dataset(&dataset(1, 3));
        assert_eq!(p.percentage, 33);
        assert!(!p.is_complete());

        let empty = ProgressInfo::from_dataset(&dataset(0, 0));
        assert_eq!(empty.percentage, 0);

        assert!(ProgressInfo::from_counts(5, 5).is_complete());
    }

    #[test]
    fn test_pending_record_is_optimistic() {
        let record = NewScanRecord::pending(3, "BOX-1", Utc::now()).with_id(1);
        assert!(record.found);
        assert!(record.first_scan);
        assert!(record.is_pending());
        assert!(record.zone.is_none());
    }

    #[test]
    fn test_server_config_without_dataset() {
        let config = ServerConfig::new("http://host/", None, Utc::now());
        assert!(config.active_dataset_id.is_none());
        assert!(config.active_dataset_name.is_none());

        let ds = dataset(0, 10);
        let config = ServerConfig::new("http://host/", Some(&ds), Utc::now());
        assert_eq!(config.active_dataset_id, Some(7));
        assert_eq!(config.active_dataset_name.as_deref(), Some("Shipment 7"));
    }

    #[test]
    fn test_record_filter_parsing() {
        assert_eq!("success".parse::<RecordFilter>().unwrap(), RecordFilter::Found);
        assert_eq!("ERROR".parse::<RecordFilter>().unwrap(), RecordFilter::NotFound);
        assert_eq!("all".parse::<RecordFilter>().unwrap(), RecordFilter::All);
        assert!("bogus".parse::<RecordFilter>().is_err());
    }

    #[test]
    fn test_dataset_deserializes_server_shape() {
        let json = r#"{"id":1,"name":"Batch","file_name":"b.xlsx","total_count":100,
                       "scanned_count":4,"is_current":1,"created_at":"2024-05-01 10:00:00"}"#;
        let ds: DatasetInfo = serde_json::from_str(json).unwrap();
        assert_eq!(ds.total_count, 100);
        assert_eq!(ds.progress().percentage, 4);
    }
}
