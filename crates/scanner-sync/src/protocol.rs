//! # Wire Protocol
//!
//! JSON bodies exchanged with the inventory server.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET  api/ping                    → PingResponse                        │
//! │  GET  api/current-dataset         → DatasetInfo | 404                   │
//! │  GET  api/datasets                → [DatasetInfo] | {datasets: [...]}   │
//! │  POST api/scan        ScanRequest → ScanResponse                        │
//! │  GET  api/scan/progress/{id}      → ProgressInfo                        │
//! │  GET  api/scan/recent?limit=N     → {records: [RemoteScan]}             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use scanner_core::{DatasetId, DatasetInfo, ProgressInfo, ScanOutcome};

pub const PING_PATH: &str = "api/ping";
pub const CURRENT_DATASET_PATH: &str = "api/current-dataset";
pub const DATASETS_PATH: &str = "api/datasets";
pub const SCAN_PATH: &str = "api/scan";
pub const RECENT_SCANS_PATH: &str = "api/scan/recent";

/// Path of the progress endpoint for one dataset.
pub fn progress_path(dataset_id: DatasetId) -> String {
    format!("api/scan/progress/{dataset_id}")
}

/// Connectivity probe response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,

    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST api/scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub dataset_id: DatasetId,
    pub box_number: String,
    pub device_id: String,
}

/// Server verdict for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    /// `"found"` or `"not_found"`.
    pub status: String,

    #[serde(default)]
    pub box_number: Option<String>,

    #[serde(default)]
    pub zone: Option<String>,

    #[serde(default)]
    pub store_address: Option<String>,

    /// Absent means first scan.
    #[serde(default)]
    pub first_scan: Option<bool>,

    #[serde(default)]
    pub progress: Option<ProgressInfo>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ScanResponse {
    pub fn is_found(&self) -> bool {
        self.status == "found"
    }

    pub fn is_duplicate(&self) -> bool {
        self.is_found() && self.first_scan == Some(false)
    }

    pub fn outcome(&self) -> ScanOutcome {
        ScanOutcome::classify(&self.status, self.first_scan)
    }
}

/// `api/datasets` body; the server wraps the list, older builds don't.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DatasetList {
    Bare(Vec<DatasetInfo>),
    Envelope { datasets: Vec<DatasetInfo> },
}

impl DatasetList {
    pub fn into_vec(self) -> Vec<DatasetInfo> {
        match self {
            DatasetList::Bare(list) => list,
            DatasetList::Envelope { datasets } => datasets,
        }
    }
}

/// One entry of the server's recent-scan feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteScan {
    pub box_number: String,

    #[serde(default)]
    pub zone: Option<String>,

    #[serde(default)]
    pub store_address: Option<String>,

    /// Server-formatted timestamp string.
    #[serde(default)]
    pub scanned_at: Option<String>,

    #[serde(default)]
    pub first_scan: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentScansResponse {
    #[serde(default)]
    pub records: Vec<RemoteScan>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_response_classification() {
        let found: ScanResponse = serde_json::from_str(
            r#"{"status":"found","box_number":"B1","zone":"A","store_address":"S1",
                "first_scan":false,"progress":{"scanned":3,"total":10,"percentage":30}}"#,
        )
        .unwrap();
        assert!(found.is_found());
        assert!(found.is_duplicate());
        assert_eq!(found.outcome(), ScanOutcome::FoundDuplicate);
        assert_eq!(found.progress.unwrap().percentage, 30);

        let missing: ScanResponse =
            serde_json::from_str(r#"{"status":"not_found","box_number":"B2"}"#).unwrap();
        assert!(!missing.is_found());
        assert_eq!(missing.outcome(), ScanOutcome::NotFound);
    }

    #[test]
    fn test_dataset_list_accepts_both_shapes() {
        let bare: DatasetList =
            serde_json::from_str(r#"[{"id":1,"name":"A","total_count":2,"scanned_count":0}]"#)
                .unwrap();
        assert_eq!(bare.into_vec().len(), 1);

        let wrapped: DatasetList = serde_json::from_str(
            r#"{"datasets":[{"id":1,"name":"A"},{"id":2,"name":"B","is_current":1}]}"#,
        )
        .unwrap();
        let list = wrapped.into_vec();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].is_current, Some(1));
    }

    #[test]
    fn test_scan_request_wire_shape() {
        let req = ScanRequest {
            dataset_id: 4,
            box_number: "BX-1".into(),
            device_id: "dock-1".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["dataset_id"], 4);
        assert_eq!(json["box_number"], "BX-1");
        assert_eq!(json["device_id"], "dock-1");
    }

    #[test]
    fn test_progress_path() {
        assert_eq!(progress_path(12), "api/scan/progress/12");
    }
}
