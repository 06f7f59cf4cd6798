//! # Sync Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Gateway      │  │     Scanner state       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  NoServer               │ │
//! │  │  MissingDeviceId│  │  Status{code}   │  │  NoActiveDataset        │ │
//! │  │  ConfigLoad/Save│  │  Malformed      │  │  UnknownDataset         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Database     │  │   Validation    │                              │
//! │  │  (DbError)      │  │  bad box code   │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Gateway failures never escape the connection controller; they surface as
//! connection state plus a message. They do reach callers of pass-through
//! operations such as `list_datasets`.

use scanner_core::{DatasetId, ValidationError};
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Gateway Errors
// =============================================================================

/// A failed request to the inventory server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Connection refused, DNS failure, timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("Server returned HTTP {code}")]
    Status { code: u16 },

    /// The body could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The base URL cannot be joined with an endpoint path.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// Returns true for 404 responses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Status { code: 404 })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            GatewayError::Status {
                code: status.as_u16(),
            }
        } else if err.is_decode() {
            GatewayError::Malformed(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        GatewayError::InvalidUrl(err.to_string())
    }
}

// =============================================================================
// Sync Errors
// =============================================================================

/// Sync error type covering all failures surfaced by this crate.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scanner configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Device id missing or empty.
    #[error("Device ID not configured")]
    MissingDeviceId,

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Gateway / Validation
    // =========================================================================
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Scanner State
    // =========================================================================
    /// No server address has been configured or connected yet.
    #[error("No server configured. Connect to a server first.")]
    NoServer,

    /// A scan was attempted with no dataset selected.
    #[error("No active dataset. Select a dataset first.")]
    NoActiveDataset,

    /// The server does not list the requested dataset.
    #[error("Dataset {0} not found on server")]
    UnknownDataset(DatasetId),

    // =========================================================================
    // Database / Internal
    // =========================================================================
    /// Local store failure.
    #[error("Database error: {0}")]
    Database(#[from] scanner_db::DbError),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Agent is shutting down.
    #[error("Scanner agent is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Gateway(err.into())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::Gateway(err.into())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the operation may succeed when retried later.
    ///
    /// ## Retryable Errors
    /// - Network failures and timeouts
    /// - 5xx responses
    ///
    /// ## Non-Retryable Errors
    /// - Configuration and validation errors
    /// - Missing server / dataset selection
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Gateway(GatewayError::Network(_)) => true,
            SyncError::Gateway(GatewayError::Status { code }) => *code >= 500,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingDeviceId
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
