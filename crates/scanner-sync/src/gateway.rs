//! # Remote Gateway
//!
//! Stateless request/response access to the inventory server.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller ──► RemoteGateway::op(base_url, ...) ──► Ok(typed body)         │
//! │                                              └─► Err(GatewayError)      │
//! │                                                                         │
//! │  • no retries here (the controller owns retry policy)                   │
//! │  • base_url is passed per call: the server can change at runtime        │
//! │  • current_dataset: 404 → Ok(None) ("connected, nothing active")        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use scanner_core::{DatasetId, DatasetInfo, ProgressInfo};

use crate::config::ScannerConfig;
use crate::error::{GatewayError, GatewayResult, SyncError, SyncResult};
use crate::protocol::{
    progress_path, DatasetList, PingResponse, RecentScansResponse, RemoteScan, ScanRequest,
    ScanResponse, CURRENT_DATASET_PATH, DATASETS_PATH, PING_PATH, RECENT_SCANS_PATH, SCAN_PATH,
};

/// Operations the scanner needs from the inventory server.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Connectivity probe.
    async fn ping(&self, base_url: &str) -> GatewayResult<PingResponse>;

    /// The dataset the server marks as current; `None` when the server has none.
    async fn current_dataset(&self, base_url: &str) -> GatewayResult<Option<DatasetInfo>>;

    async fn list_datasets(&self, base_url: &str) -> GatewayResult<Vec<DatasetInfo>>;

    async fn submit_scan(&self, base_url: &str, request: &ScanRequest)
        -> GatewayResult<ScanResponse>;

    async fn progress(&self, base_url: &str, dataset_id: DatasetId)
        -> GatewayResult<ProgressInfo>;

    /// Latest scans recorded by the server, across devices.
    async fn recent_scans(&self, base_url: &str, limit: u32) -> GatewayResult<Vec<RemoteScan>>;
}

// =============================================================================
// HTTP Gateway
// =============================================================================

/// [`RemoteGateway`] over HTTP with fixed connect and request timeouts.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
}

impl HttpGateway {
    /// Builds a gateway with the given timeouts.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| SyncError::HttpClient(e.to_string()))?;

        Ok(HttpGateway { client })
    }

    /// Builds a gateway using the timeouts from `[server]`.
    pub fn from_config(config: &ScannerConfig) -> SyncResult<Self> {
        Self::new(config.connect_timeout(), config.request_timeout())
    }

    fn endpoint(base_url: &str, path: &str) -> GatewayResult<Url> {
        Ok(Url::parse(base_url)?.join(path)?)
    }

    async fn get(&self, base_url: &str, path: &str) -> GatewayResult<Response> {
        let url = Self::endpoint(base_url, path)?;
        debug!(%url, "GET");
        Ok(self.client.get(url).send().await?)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                code: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn ping(&self, base_url: &str) -> GatewayResult<PingResponse> {
        Self::decode(self.get(base_url, PING_PATH).await?).await
    }

    async fn current_dataset(&self, base_url: &str) -> GatewayResult<Option<DatasetInfo>> {
        let response = self.get(base_url, CURRENT_DATASET_PATH).await?;
        match Self::decode(response).await {
            Ok(dataset) => Ok(Some(dataset)),
            Err(e) if e.is_not_found() => {
                debug!("Server has no current dataset");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_datasets(&self, base_url: &str) -> GatewayResult<Vec<DatasetInfo>> {
        let list: DatasetList = Self::decode(self.get(base_url, DATASETS_PATH).await?).await?;
        Ok(list.into_vec())
    }

    async fn submit_scan(
        &self,
        base_url: &str,
        request: &ScanRequest,
    ) -> GatewayResult<ScanResponse> {
        let url = Self::endpoint(base_url, SCAN_PATH)?;
        debug!(%url, box_number = %request.box_number, "POST scan");
        let response = self.client.post(url).json(request).send().await?;
        Self::decode(response).await
    }

    async fn progress(&self, base_url: &str, dataset_id: DatasetId) -> GatewayResult<ProgressInfo> {
        Self::decode(self.get(base_url, &progress_path(dataset_id)).await?).await
    }

    async fn recent_scans(&self, base_url: &str, limit: u32) -> GatewayResult<Vec<RemoteScan>> {
        let mut url = Self::endpoint(base_url, RECENT_SCANS_PATH)?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let response = self.client.get(url).send().await?;
        let body: RecentScansResponse = Self::decode(response).await?;
        Ok(body.records)
    }
}

// =============================================================================
// Tests (against a fake inventory server)
// =============================================================================
