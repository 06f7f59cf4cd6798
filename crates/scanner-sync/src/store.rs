//! # Local Store Seam
//!
//! The sync engine and controller talk to the record store through
//! [`LocalStore`]. [`scanner_db::Database`] is the production implementation.

use async_trait::async_trait;
use tokio::sync::watch;

use scanner_core::{DatasetId, NewScanRecord, RecordFilter, RecordId, ScanRecord, ServerConfig};
use scanner_db::{Database, DbResult};

/// Durable storage for scan records and the saved server config.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Appends a record and returns it with its id.
    async fn append_record(&self, record: NewScanRecord) -> DbResult<ScanRecord>;

    /// Most recent `limit` records of a dataset, newest first.
    async fn recent_records(&self, dataset_id: DatasetId, limit: u32)
        -> DbResult<Vec<ScanRecord>>;

    /// Records of a dataset with the given `found` flag, newest first.
    async fn records_by_found(&self, dataset_id: DatasetId, found: bool)
        -> DbResult<Vec<ScanRecord>>;

    /// All records with `uploaded = false`, oldest first.
    async fn pending_records(&self) -> DbResult<Vec<ScanRecord>>;

    async fn pending_count(&self) -> DbResult<i64>;

    /// Returns false if the record no longer exists.
    async fn mark_uploaded(&self, id: RecordId) -> DbResult<bool>;

    async fn delete_dataset_records(&self, dataset_id: DatasetId) -> DbResult<u64>;

    async fn load_server_config(&self) -> DbResult<Option<ServerConfig>>;

    async fn save_server_config(&self, config: &ServerConfig) -> DbResult<()>;

    /// Change counter; increases after every write.
    fn changes(&self) -> watch::Receiver<u64>;

    /// Records matching a list-view filter.
    async fn filtered_records(
        &self,
        dataset_id: DatasetId,
        filter: RecordFilter,
        recent_limit: u32,
    ) -> DbResult<Vec<ScanRecord>> {
        match filter {
            RecordFilter::All => self.recent_records(dataset_id, recent_limit).await,
            RecordFilter::Found => self.records_by_found(dataset_id, true).await,
            RecordFilter::NotFound => self.records_by_found(dataset_id, false).await,
        }
    }
}

#[async_trait]
impl LocalStore for Database {
    async fn append_record(&self, record: NewScanRecord) -> DbResult<ScanRecord> {
        self.scan_records().insert(&record).await
    }

    async fn recent_records(
        &self,
        dataset_id: DatasetId,
        limit: u32,
    ) -> DbResult<Vec<ScanRecord>> {
        self.scan_records().recent(dataset_id, limit).await
    }

    async fn records_by_found(
        &self,
        dataset_id: DatasetId,
        found: bool,
    ) -> DbResult<Vec<ScanRecord>> {
        self.scan_records().by_found(dataset_id, found).await
    }

    async fn pending_records(&self) -> DbResult<Vec<ScanRecord>> {
        self.scan_records().pending().await
    }

    async fn pending_count(&self) -> DbResult<i64> {
        self.scan_records().count_pending().await
    }

    async fn mark_uploaded(&self, id: RecordId) -> DbResult<bool> {
        self.scan_records().mark_uploaded(id).await
    }

    async fn delete_dataset_records(&self, dataset_id: DatasetId) -> DbResult<u64> {
        self.scan_records().delete_by_dataset(dataset_id).await
    }

    async fn load_server_config(&self) -> DbResult<Option<ServerConfig>> {
        self.server_config().get().await
    }

    async fn save_server_config(&self, config: &ServerConfig) -> DbResult<()> {
        self.server_config().save(config).await
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.subscribe_changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scanner_db::DbConfig;

    #[tokio::test]
    async fn test_database_filtered_records() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: &dyn LocalStore = &db;

        let mut found = NewScanRecord::pending(1, "OK", Utc::now());
        found.uploaded = true;
        store.append_record(found).await.unwrap();

        let mut missing = NewScanRecord::pending(1, "MISS", Utc::now());
        missing.found = false;
        missing.uploaded = true;
        store.append_record(missing).await.unwrap();

        let all = store.filtered_records(1, RecordFilter::All, 20).await.unwrap();
        assert_eq!(all.len(), 2);

        let not_found = store
            .filtered_records(1, RecordFilter::NotFound, 20)
            .await
            .unwrap();
        assert_eq!(not_found.len(), 1);
        assert_eq!(not_found[0].box_number, "MISS");

        assert_eq!(store.pending_count().await.unwrap(), 0);
    }
}
