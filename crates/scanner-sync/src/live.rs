//! # Live Queries
//!
//! Streams of query snapshots that refresh whenever the store changes.
//!
//! ```text
//!  store write ──► change counter (watch) ──► WatchStream ──► re-run query ──► item
//!
//!  • first poll yields the current result immediately
//!  • bursts of writes between polls collapse into one re-query
//!  • dropping the stream stops it; calling the constructor again restarts it
//! ```

use futures_util::stream::{BoxStream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use scanner_core::{DatasetId, RecordFilter, ScanRecord, ServerConfig};
use scanner_db::DbResult;

use crate::store::LocalStore;

/// A live query: one snapshot per observed change.
pub type LiveQuery<T> = BoxStream<'static, DbResult<T>>;

/// Re-runs `query` on subscription and after every change notification.
pub fn live_query<T, F, Fut>(changes: watch::Receiver<u64>, query: F) -> LiveQuery<T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DbResult<T>> + Send + 'static,
{
    let query = Arc::new(query);
    WatchStream::new(changes)
        .then(move |_| {
            let query = Arc::clone(&query);
            async move { query().await }
        })
        .boxed()
}

/// Number of records still waiting for upload.
pub fn pending_count(store: Arc<dyn LocalStore>) -> LiveQuery<i64> {
    let changes = store.changes();
    live_query(changes, move || {
        let store = Arc::clone(&store);
        async move { store.pending_count().await }
    })
}

/// Records of one dataset for a list view.
pub fn records(
    store: Arc<dyn LocalStore>,
    dataset_id: DatasetId,
    filter: RecordFilter,
    recent_limit: u32,
) -> LiveQuery<Vec<ScanRecord>> {
    let changes = store.changes();
    live_query(changes, move || {
        let store = Arc::clone(&store);
        async move {
            store
                .filtered_records(dataset_id, filter, recent_limit)
                .await
        }
    })
}

/// The saved server config.
pub fn server_config(store: Arc<dyn LocalStore>) -> LiveQuery<Option<ServerConfig>> {
    let changes = store.changes();
    live_query(changes, move || {
        let store = Arc::clone(&store);
        async move { store.load_server_config().await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scanner_core::NewScanRecord;
    use scanner_db::{Database, DbConfig};

    async fn store() -> Arc<dyn LocalStore> {
        Arc::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    #[tokio::test]
    async fn test_pending_count_follows_writes() {
        let store = store().await;
        let mut stream = pending_count(store.clone());

        assert_eq!(stream.next().await.unwrap().unwrap(), 0);

        let rec = store
            .append_record(NewScanRecord::pending(1, "A", Utc::now()))
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), 1);

        store.mark_uploaded(rec.id).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_stream_is_restartable() {
        let store = store().await;
        store
            .append_record(NewScanRecord::pending(3, "A", Utc::now()))
            .await
            .unwrap();

        let mut first = records(store.clone(), 3, RecordFilter::All, 20);
        assert_eq!(first.next().await.unwrap().unwrap().len(), 1);
        drop(first);

        store
            .append_record(NewScanRecord::pending(3, "B", Utc::now()))
            .await
            .unwrap();

        let mut second = records(store.clone(), 3, RecordFilter::All, 20);
        let snapshot = second.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].box_number, "B");
    }

    #[tokio::test]
    async fn test_server_config_stream() {
        let store = store().await;
        let mut stream = server_config(store.clone());
        assert!(stream.next().await.unwrap().unwrap().is_none());

        store
            .save_server_config(&ServerConfig::new("http://a/", None, Utc::now()))
            .await
            .unwrap();
        let saved = stream.next().await.unwrap().unwrap().unwrap();
        assert_eq!(saved.server_url, "http://a/");
    }
}
