//! # scanner-core: Domain Model for the Scanner Client
//!
//! Pure types and rules shared by the record store and the sync engine.
//! Nothing in this crate touches the network, the database or the clock
//! except through values handed to it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scanner Client Layers                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/scanner-cli (composition)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     scanner-sync: gateway, connection, poller, sync engine      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            scanner-db: SQLite scan records + config             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ scanner-core (THIS CRATE) ★                      │   │
//! │  │   ScanRecord • ServerConfig • DatasetInfo • ScanOutcome         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (scan records, server config, datasets, progress)
//! - [`validation`] - Box code validation and server URL normalization
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use scanner_core::validation::normalize_base_url;
//!
//! assert_eq!(normalize_base_url("example.com"), "http://example.com/");
//! ```

pub mod error;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use types::*;

/// Number of records shown in the "recent scans" view.
pub const DEFAULT_RECENT_LIMIT: u32 = 20;

/// Device identifier sent with scans when none is configured.
pub const DEFAULT_DEVICE_ID: &str = "handheld_scanner";
