//! # Server Config Repository
//!
//! Holds the single saved connection (row id = 1). Writes are upserts, so the
//! table never has more than one row.

use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::notify;
use crate::repository::millis_to_datetime;
use scanner_core::ServerConfig;

const TABLE: &str = "server_config";

#[derive(Debug, sqlx::FromRow)]
struct ServerConfigRow {
    server_url: String,
    active_dataset_id: Option<i64>,
    active_dataset_name: Option<String>,
    last_connected: i64,
}

/// Repository for the saved server connection.
#[derive(Debug, Clone)]
pub struct ServerConfigRepository {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl ServerConfigRepository {
    pub fn new(pool: SqlitePool, changes: Arc<watch::Sender<u64>>) -> Self {
        ServerConfigRepository { pool, changes }
    }

    /// Loads the saved config, if any.
    pub async fn get(&self) -> DbResult<Option<ServerConfig>> {
        let row: Option<ServerConfigRow> = sqlx::query_as(
            r#"
            SELECT server_url, active_dataset_id, active_dataset_name, last_connected
            FROM server_config
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(ServerConfig {
                server_url: row.server_url,
                active_dataset_id: row.active_dataset_id,
                active_dataset_name: row.active_dataset_name,
                last_connected: millis_to_datetime(TABLE, row.last_connected)?,
            })
        })
        .transpose()
    }

    /// Saves the config, replacing whatever was stored.
    pub async fn save(&self, config: &ServerConfig) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO server_config (
                id, server_url, active_dataset_id, active_dataset_name, last_connected
            ) VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                server_url = excluded.server_url,
                active_dataset_id = excluded.active_dataset_id,
                active_dataset_name = excluded.active_dataset_name,
                last_connected = excluded.last_connected
            "#,
        )
        .bind(&config.server_url)
        .bind(config.active_dataset_id)
        .bind(&config.active_dataset_name)
        .bind(config.last_connected.timestamp_millis())
        .execute(&self.pool)
        .await?;

        debug!(
            server_url = %config.server_url,
            dataset_id = ?config.active_dataset_id,
            "Server config saved"
        );
        notify(&self.changes);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use chrono::{DateTime, Utc};
    use scanner_core::{DatasetInfo, ServerConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn dataset() -> DatasetInfo {
        DatasetInfo {
            id: 4,
            name: "Inbound".into(),
            file_name: None,
            total_count: 10,
            scanned_count: 2,
            is_current: Some(1),
            created_at: None,
        }
    }

    fn now_millis() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_until_saved() {
        let db = db().await;
        assert!(db.server_config().get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_single_row() {
        let db = db().await;
        let repo = db.server_config();

        let first = ServerConfig::new("http://a/", Some(&dataset()), now_millis());
        repo.save(&first).await.unwrap();

        let second = ServerConfig::new("http://b/", None, now_millis());
        repo.save(&second).await.unwrap();

        let loaded = repo.get().await.unwrap().unwrap();
        assert_eq!(loaded, second);
        assert!(loaded.active_dataset_id.is_none());
        assert!(loaded.active_dataset_name.is_none());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM server_config")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_second_row_rejected() {
        let db = db().await;
        let err = sqlx::query(
            "INSERT INTO server_config (id, server_url, last_connected) VALUES (2, 'x', 0)",
        )
        .execute(db.pool())
        .await
        .unwrap_err();

        assert!(matches!(DbError::from(err), DbError::ConstraintViolation(_)));
    }
}
