//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sync Engine / Controller                                               │
//! │       │                                                                 │
//! │       │  db.scan_records().pending()                                    │
//! │       ▼                                                                 │
//! │  ScanRecordRepository          ServerConfigRepository                   │
//! │  ├── insert                    ├── get                                  │
//! │  ├── recent / found / ...      └── save (upsert id = 1)                 │
//! │  ├── pending / count_pending                                            │
//! │  ├── mark_uploaded                                                      │
//! │  └── delete_by_dataset                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite + change counter bump on every write                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ScanRecordRepository`](scan_record::ScanRecordRepository) - cached scan attempts
//! - [`ServerConfigRepository`](server_config::ServerConfigRepository) - saved connection

pub mod scan_record;
pub mod server_config;

use chrono::{DateTime, Utc};

use crate::error::{DbError, DbResult};

/// Converts stored epoch milliseconds back into a timestamp.
pub(crate) fn millis_to_datetime(table: &str, millis: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DbError::corrupt(table, format!("timestamp out of range: {millis}")))
}
