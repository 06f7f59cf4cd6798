//! # scanner-db: Local Record Store
//!
//! Durable storage for the scanner client: every scan attempt, plus the one
//! saved server connection.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scanner Data Flow                                │
//! │                                                                         │
//! │  Sync Engine (submit_scan / drain)     Connection Controller            │
//! │       │                                      │                          │
//! │       ▼                                      ▼                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  scanner-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐    ┌────────────┐  │   │
//! │  │   │   Database    │    │  Repositories    │    │ Migrations │  │   │
//! │  │   │   (pool.rs)   │◄───│  ScanRecordRepo  │    │ (embedded) │  │   │
//! │  │   │ SqlitePool    │    │  ServerConfigRepo│    │ 001_init   │  │   │
//! │  │   │ change watch  │    └──────────────────┘    └────────────┘  │   │
//! │  │   └───────────────┘                                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file in the platform data directory                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and change notification
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Scan record and server config repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scanner_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("scanner.db")).await?;
//! let pending = db.scan_records().pending().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::scan_record::ScanRecordRepository;
pub use repository::server_config::ServerConfigRepository;
