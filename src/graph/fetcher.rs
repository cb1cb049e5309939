use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::{swaps_query, GraphRequest, GraphResponse, Swap, SwapRecord, SwapV2, SwapV3};
use crate::{config::ProtocolVersion, errors::FetchError};

/// Timestamp (unix seconds) of the newest swap consumed so far. Only lives for
/// the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(u64);

impl Watermark {
    pub fn new(timestamp: u64) -> Self {
        Self(timestamp)
    }

    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp().max(0) as u64)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// never moves backwards, an empty batch leaves it untouched
    pub fn advance(&mut self, swaps: &[SwapRecord]) {
        if let Some(latest) = swaps.iter().map(|s| s.timestamp).max() {
            self.0 = self.0.max(latest);
        }
    }
}

pub struct SwapFetcher {
    client: reqwest::Client,
    url: String,
    version: ProtocolVersion,
}

impl SwapFetcher {
    pub fn new(url: impl Into<String>, version: ProtocolVersion) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            version,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Swaps strictly newer than `timestamp_gt`, oldest first, at most 1000.
    pub async fn fetch_since(&self, timestamp_gt: u64) -> Result<Vec<Swap>, FetchError> {
        let query = swaps_query(self.version, timestamp_gt);

        let swaps = match self.version {
            ProtocolVersion::V2 => self
                .post::<SwapV2>(query)
                .await?
                .into_iter()
                .map(Swap::V2)
                .collect(),
            ProtocolVersion::V3 => self
                .post::<SwapV3>(query)
                .await?
                .into_iter()
                .map(Swap::V3)
                .collect(),
        };

        Ok(swaps)
    }

    /// Fetches the next batch after the watermark and moves the watermark to
    /// its newest swap. Failures are logged and read as an empty batch, so
    /// the next tick retries from the same watermark.
    pub async fn poll(&self, watermark: &mut Watermark) -> Vec<SwapRecord> {
        let swaps = match self.fetch_since(watermark.get()).await {
            Ok(swaps) => swaps,
            Err(e) => {
                error!(target: "uni-volume::fetcher", "error fetching swaps from the indexer - {:?}", e);
                return Vec::new();
            }
        };

        let records = swaps.into_iter().map(Swap::normalize).collect::<Vec<_>>();
        watermark.advance(&records);

        if records.is_empty() {
            debug!(target: "uni-volume::fetcher", "no swaps after {}", watermark.get());
        } else {
            info!(target: "uni-volume::fetcher", "fetched {} {} swaps, watermark now {}", records.len(), self.version, watermark.get());
        }

        records
    }

    async fn post<T: DeserializeOwned>(&self, query: String) -> Result<Vec<T>, FetchError> {
        let response: GraphResponse<T> = self
            .client
            .post(&self.url)
            .json(&GraphRequest { query })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_swaps()
    }
}
