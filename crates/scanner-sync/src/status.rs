//! # Scanner Status
//!
//! Connectivity state, the status snapshot exposed to the UI and the event
//! emitter used to push changes out.
//!
//! ## State Machine
//! ```text
//!                 connect(url)
//!  Disconnected ───────────────► Connecting ──── probe ok ────► Connected
//!       ▲                            │                            │
//!       │                        probe failed                poll / drain /
//!       │                            ▼                        scan failure
//!       │   attempts exhausted  Reconnecting{n, max} ◄────────────┘
//!       └───────────────────────────┘    │
//!                                        └── probe ok ──────────► Connected
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scanner_core::{DatasetId, DatasetInfo, ProgressInfo};

// =============================================================================
// Connection State
// =============================================================================

/// Connectivity to the inventory server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected and not retrying.
    #[default]
    Disconnected,
    /// First probe in flight.
    Connecting,
    /// Server reachable.
    Connected,
    /// Waiting for, or running, reconnect attempt `attempt` of `max_attempts`.
    Reconnecting { attempt: u32, max_attempts: u32 },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting {
                attempt,
                max_attempts,
            } => write!(f, "reconnecting ({attempt}/{max_attempts})"),
        }
    }
}

// =============================================================================
// Scanner Status
// =============================================================================

/// Snapshot of what the scanner UI shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerStatus {
    pub state: ConnectionState,

    /// Normalized base URL of the current server.
    pub server_url: Option<String>,

    pub active_dataset_id: Option<DatasetId>,

    pub active_dataset_name: Option<String>,

    /// Last progress seen for the active dataset.
    pub progress: Option<ProgressInfo>,

    /// Local records not yet acknowledged by the server.
    pub pending_count: i64,

    /// Most recent failure message, cleared on successful connect.
    pub last_error: Option<String>,

    pub last_connected: Option<DateTime<Utc>>,
}

impl ScannerStatus {
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn has_active_dataset(&self) -> bool {
        self.active_dataset_id.is_some()
    }

    /// Points the status at `dataset`, or clears the dataset fields.
    pub fn set_dataset(&mut self, dataset: Option<&DatasetInfo>) {
        self.active_dataset_id = dataset.map(|d| d.id);
        self.active_dataset_name = dataset.map(|d| d.name.clone());
        self.progress = dataset.map(ProgressInfo::from_dataset);
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Sink for status events (a UI layer, a log, a test probe).
pub trait ScannerEventEmitter: Send + Sync {
    /// Emits a status change.
    fn emit_status(&self, status: &ScannerStatus);

    /// Emits fresh progress for the active dataset.
    fn emit_progress(&self, progress: &ProgressInfo);

    /// Emits a failure message.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// Emitter that drops every event.
pub struct NoOpEmitter;

impl ScannerEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &ScannerStatus) {}
    fn emit_progress(&self, _progress: &ProgressInfo) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}
