//! Status events written to the log.

use tracing::{info, warn};

use scanner_core::ProgressInfo;
use scanner_sync::{ScannerEventEmitter, ScannerStatus};

pub struct TracingEmitter;

impl ScannerEventEmitter for TracingEmitter {
    fn emit_status(&self, status: &ScannerStatus) {
        info!(
            state = %status.state,
            server = status.server_url.as_deref().unwrap_or("-"),
            dataset = status.active_dataset_name.as_deref().unwrap_or("-"),
            "Status"
        );
    }

    fn emit_progress(&self, progress: &ProgressInfo) {
        info!(
            scanned = progress.scanned,
            total = progress.total,
            percentage = progress.percentage,
            "Progress"
        );
    }

    fn emit_error(&self, message: &str, retryable: bool) {
        warn!(retryable, "{message}");
    }
}
