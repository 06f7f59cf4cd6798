//! # scanner-sync: Offline-Resilient Sync for the Scanner Client
//!
//! Keeps a handheld scanner useful when the inventory server is unreachable:
//! every scan is recorded locally, failed submissions are queued, and the
//! queue is replayed once the server answers again.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scanner Sync Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  ScannerAgent (composition root)                 │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Connection     │  │  SyncEngine    │  │  Live queries          │    │
//! │  │ Controller     │  │                │  │                        │    │
//! │  │ connect,       │  │ submit scan,   │  │ change counter ──►     │    │
//! │  │ reconnect (3x),│  │ queue on fail, │  │ snapshot streams       │    │
//! │  │ progress poll  │  │ ordered drain  │  │                        │    │
//! │  └───────┬────────┘  └───────┬────────┘  └───────────┬────────────┘    │
//! │          │                   │                       │                  │
//! │          ▼                   ▼                       ▼                  │
//! │  ┌─────────────────────────────┐   ┌─────────────────────────────┐     │
//! │  │ RemoteGateway (HttpGateway) │   │ LocalStore (scanner-db)     │     │
//! │  └─────────────────────────────┘   └─────────────────────────────┘     │
//! │                                                                         │
//! │  STATUS EVENTS (ScannerEventEmitter):                                  │
//! │  • emit_status   - connection state, server, dataset                   │
//! │  • emit_progress - scanned / total for the active dataset              │
//! │  • emit_error    - failure message + whether a retry is pending        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - `ScannerAgent` composition root
//! - [`config`] - Scanner configuration (TOML + environment)
//! - [`connection`] - Connection state machine and reconnect loop
//! - [`poller`] - Progress poller for the active dataset
//! - [`engine`] - Scan submission and pending-upload drain
//! - [`gateway`] - Inventory server client
//! - [`protocol`] - JSON request and response bodies
//! - [`store`] - Local store seam over `scanner-db`
//! - [`live`] - Restartable live query streams
//! - [`status`] - Status snapshot and event emitter
//! - [`tasks`] - Background loop slots
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scanner_sync::{ScannerAgent, ScannerConfig};
//!
//! let config = ScannerConfig::load_or_default(None);
//! let agent = ScannerAgent::open(config).await?;
//! agent.start().await?;
//!
//! let result = agent.scan("BOX-0042").await?;
//! println!("{}", result.message());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod live;
pub mod poller;
pub mod protocol;
pub mod status;
pub mod store;
pub mod tasks;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::ScannerAgent;
pub use config::ScannerConfig;
pub use connection::{ConnectOutcome, ConnectionController, ControllerSettings};
pub use engine::{DrainHalt, DrainReport, ScanResult, SyncEngine};
pub use error::{GatewayError, GatewayResult, SyncError, SyncResult};
pub use gateway::{HttpGateway, RemoteGateway};
pub use live::LiveQuery;
pub use status::{ConnectionState, NoOpEmitter, ScannerEventEmitter, ScannerStatus};
pub use store::LocalStore;
