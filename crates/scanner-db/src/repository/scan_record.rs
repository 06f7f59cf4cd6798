//! # Scan Record Repository
//!
//! Every scan attempt lands here, whether or not the server saw it.
//!
//! ## Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  submit succeeded ──► INSERT (uploaded = 1)                             │
//! │                                                                         │
//! │  submit failed    ──► INSERT (uploaded = 0, found = 1) ── pending ──┐   │
//! │                                                                     │   │
//! │  drain:  SELECT ... WHERE uploaded = 0 ORDER BY scanned_at, id  ◄───┘   │
//! │          resubmit ──► UPDATE uploaded = 1                               │
//! │                                                                         │
//! │  dataset discarded ──► DELETE WHERE dataset_id = ?                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records captured in the same millisecond are ordered by id.

use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::notify;
use crate::repository::millis_to_datetime;
use scanner_core::{DatasetId, NewScanRecord, RecordId, ScanRecord};

const TABLE: &str = "cached_scan_records";

const SELECT_COLUMNS: &str = "SELECT id, box_number, zone, store_address, first_scan, found, \
     dataset_id, scanned_at, uploaded FROM cached_scan_records";

/// Raw row as stored in SQLite.
#[derive(Debug, sqlx::FromRow)]
struct ScanRecordRow {
    id: i64,
    box_number: String,
    zone: Option<String>,
    store_address: Option<String>,
    first_scan: bool,
    found: bool,
    dataset_id: i64,
    scanned_at: i64,
    uploaded: bool,
}

impl TryFrom<ScanRecordRow> for ScanRecord {
    type Error = crate::error::DbError;

    fn try_from(row: ScanRecordRow) -> DbResult<Self> {
        Ok(ScanRecord {
            id: row.id,
            box_number: row.box_number,
            zone: row.zone,
            store_address: row.store_address,
            first_scan: row.first_scan,
            found: row.found,
            dataset_id: row.dataset_id,
            scanned_at: millis_to_datetime(TABLE, row.scanned_at)?,
            uploaded: row.uploaded,
        })
    }
}

fn into_records(rows: Vec<ScanRecordRow>) -> DbResult<Vec<ScanRecord>> {
    rows.into_iter().map(ScanRecord::try_from).collect()
}

/// Repository for cached scan records.
#[derive(Debug, Clone)]
pub struct ScanRecordRepository {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl ScanRecordRepository {
    pub fn new(pool: SqlitePool, changes: Arc<watch::Sender<u64>>) -> Self {
        ScanRecordRepository { pool, changes }
    }

    /// Appends a scan record and returns it with its assigned id.
    pub async fn insert(&self, record: &NewScanRecord) -> DbResult<ScanRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO cached_scan_records (
                box_number, zone, store_address, first_scan, found,
                dataset_id, scanned_at, uploaded
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.box_number)
        .bind(&record.zone)
        .bind(&record.store_address)
        .bind(record.first_scan)
        .bind(record.found)
        .bind(record.dataset_id)
        .bind(record.scanned_at.timestamp_millis())
        .bind(record.uploaded)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(
            id,
            box_number = %record.box_number,
            dataset_id = record.dataset_id,
            uploaded = record.uploaded,
            "Scan record cached"
        );
        notify(&self.changes);

        Ok(record.clone().with_id(id))
    }

    /// Gets a record by id.
    pub async fn get(&self, id: RecordId) -> DbResult<Option<ScanRecord>> {
        let row: Option<ScanRecordRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(ScanRecord::try_from).transpose()
    }

    /// Most recent `limit` records for a dataset, newest first.
    pub async fn recent(&self, dataset_id: DatasetId, limit: u32) -> DbResult<Vec<ScanRecord>> {
        let rows: Vec<ScanRecordRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE dataset_id = ?1 ORDER BY scanned_at DESC, id DESC LIMIT ?2"
        ))
        .bind(dataset_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    /// All records for a dataset with the given `found` flag, newest first.
    pub async fn by_found(&self, dataset_id: DatasetId, found: bool) -> DbResult<Vec<ScanRecord>> {
        let rows: Vec<ScanRecordRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE dataset_id = ?1 AND found = ?2 \
             ORDER BY scanned_at DESC, id DESC"
        ))
        .bind(dataset_id)
        .bind(found)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    /// Records the server found, newest first.
    pub async fn found(&self, dataset_id: DatasetId) -> DbResult<Vec<ScanRecord>> {
        self.by_found(dataset_id, true).await
    }

    /// Records the server did not find, newest first.
    pub async fn not_found(&self, dataset_id: DatasetId) -> DbResult<Vec<ScanRecord>> {
        self.by_found(dataset_id, false).await
    }

    /// Every record not yet acknowledged by the server, oldest first.
    ///
    /// This spans all datasets; each record is replayed under its own.
    pub async fn pending(&self) -> DbResult<Vec<ScanRecord>> {
        let rows: Vec<ScanRecordRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE uploaded = 0 ORDER BY scanned_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    /// Counts records with `uploaded = 0`.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cached_scan_records WHERE uploaded = 0")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Flips one record to uploaded.
    ///
    /// Returns false when the record no longer exists (its dataset was
    /// discarded while a drain was in flight).
    pub async fn mark_uploaded(&self, id: RecordId) -> DbResult<bool> {
        let result = sqlx::query("UPDATE cached_scan_records SET uploaded = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            notify(&self.changes);
        }
        Ok(updated)
    }

    /// Deletes every record for a dataset; returns how many were removed.
    pub async fn delete_by_dataset(&self, dataset_id: DatasetId) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cached_scan_records WHERE dataset_id = ?1")
            .bind(dataset_id)
            .execute(&self.pool)
            .await?;

        debug!(dataset_id, deleted = result.rows_affected(), "Dataset records discarded");
        notify(&self.changes);
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use chrono::{DateTime, Utc};
    use scanner_core::NewScanRecord;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn at(offset_ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + offset_ms).unwrap()
    }

    fn uploaded(dataset: i64, code: &str, found: bool, t: DateTime<Utc>) -> NewScanRecord {
        NewScanRecord {
            box_number: code.into(),
            zone: Some("A1".into()),
            store_address: Some("Dock 3".into()),
            first_scan: true,
            found,
            dataset_id: dataset,
            scanned_at: t,
            uploaded: true,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let db = db().await;
        let repo = db.scan_records();

        let a = repo.insert(&NewScanRecord::pending(1, "A", at(0))).await.unwrap();
        let b = repo.insert(&NewScanRecord::pending(1, "B", at(0))).await.unwrap();
        assert!(b.id > a.id);

        let fetched = repo.get(a.id).await.unwrap().unwrap();
        assert_eq!(fetched, a);
        assert_eq!(fetched.scanned_at, at(0));
        assert!(repo.get(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_limited() {
        let db = db().await;
        let repo = db.scan_records();

        for i in 0..5 {
            repo.insert(&uploaded(1, &format!("BOX-{i}"), true, at(i * 10)))
                .await
                .unwrap();
        }
        repo.insert(&uploaded(2, "OTHER", true, at(100))).await.unwrap();

        let recent = repo.recent(1, 3).await.unwrap();
        let codes: Vec<_> = recent.iter().map(|r| r.box_number.as_str()).collect();
        assert_eq!(codes, vec!["BOX-4", "BOX-3", "BOX-2"]);
    }

    #[tokio::test]
    async fn test_same_millisecond_ties_break_by_id() {
        let db = db().await;
        let repo = db.scan_records();

        repo.insert(&NewScanRecord::pending(1, "first", at(5))).await.unwrap();
        repo.insert(&NewScanRecord::pending(1, "second", at(5))).await.unwrap();

        let pending = repo.pending().await.unwrap();
        assert_eq!(pending[0].box_number, "first");
        assert_eq!(pending[1].box_number, "second");

        let recent = repo.recent(1, 10).await.unwrap();
        assert_eq!(recent[0].box_number, "second");
    }

    #[tokio::test]
    async fn test_found_and_not_found_views() {
        let db = db().await;
        let repo = db.scan_records();

        repo.insert(&uploaded(1, "OK-1", true, at(0))).await.unwrap();
        repo.insert(&uploaded(1, "MISS-1", false, at(1))).await.unwrap();
        repo.insert(&uploaded(1, "OK-2", true, at(2))).await.unwrap();

        let found = repo.found(1).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].box_number, "OK-2");

        let missing = repo.not_found(1).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].box_number, "MISS-1");
    }

    #[tokio::test]
    async fn test_pending_spans_datasets_oldest_first() {
        let db = db().await;
        let repo = db.scan_records();

        repo.insert(&NewScanRecord::pending(2, "late", at(50))).await.unwrap();
        repo.insert(&uploaded(1, "done", true, at(10))).await.unwrap();
        repo.insert(&NewScanRecord::pending(1, "early", at(20))).await.unwrap();

        let pending = repo.pending().await.unwrap();
        let codes: Vec<_> = pending.iter().map(|r| (r.box_number.as_str(), r.dataset_id)).collect();
        assert_eq!(codes, vec![("early", 1), ("late", 2)]);
        assert_eq!(repo.count_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_uploaded() {
        let db = db().await;
        let repo = db.scan_records();

        let rec = repo.insert(&NewScanRecord::pending(1, "A", at(0))).await.unwrap();
        assert!(repo.mark_uploaded(rec.id).await.unwrap());
        assert_eq!(repo.count_pending().await.unwrap(), 0);
        assert!(repo.get(rec.id).await.unwrap().unwrap().uploaded);

        assert!(!repo.mark_uploaded(12345).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_dataset() {
        let db = db().await;
        let repo = db.scan_records();

        repo.insert(&NewScanRecord::pending(1, "A", at(0))).await.unwrap();
        repo.insert(&NewScanRecord::pending(1, "B", at(1))).await.unwrap();
        repo.insert(&NewScanRecord::pending(2, "C", at(2))).await.unwrap();

        assert_eq!(repo.delete_by_dataset(1).await.unwrap(), 2);
        assert_eq!(repo.count_pending().await.unwrap(), 1);
        assert!(repo.recent(1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_bump_change_counter() {
        let db = db().await;
        let repo = db.scan_records();
        let mut changes = db.subscribe_changes();
        let before = *changes.borrow_and_update();

        let rec = repo.insert(&NewScanRecord::pending(1, "A", at(0))).await.unwrap();
        assert!(changes.has_changed().unwrap());
        let after_insert = *changes.borrow_and_update();
        assert!(after_insert > before);

        repo.mark_uploaded(rec.id).await.unwrap();
        assert!(*changes.borrow_and_update() > after_insert);

        // reads don't notify
        repo.pending().await.unwrap();
        assert!(!changes.has_changed().unwrap());
    }
}
