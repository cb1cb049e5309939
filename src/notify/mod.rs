mod email;
pub use email::*;

mod telegram;
pub use telegram::*;

use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, error, info};

use crate::{
    aggregator::{BucketKey, BucketMetrics, MetricKind},
    errors::{NotifyError, StoreError},
    store::MetricStore,
    utils::{format_usd, stored_f64},
};

/// notional LP position the fee yield is normalised to
pub const LP_SIZE: f64 = 1000.0;

/// buckets with less liquidity than this are never reported
pub const MIN_TVL: f64 = 10_000.0;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_email(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketReport {
    pub bucket: BucketKey,
    pub metrics: BucketMetrics,
    pub ratio: f64,
}

impl BucketReport {
    pub fn new(bucket: BucketKey, metrics: BucketMetrics) -> Self {
        let ratio = metrics.fee_ratio(LP_SIZE);
        Self { bucket, metrics, ratio }
    }

    pub fn render(&self) -> String {
        format!(
            "{} (Fee Tier: {}): ${} (TVL: ${}, Fees: ${}, Fee/TVL Earnings for {}$ LP: {:.2})",
            self.bucket.pair(),
            self.bucket.fee_tier(),
            format_usd(self.metrics.volume),
            format_usd(self.metrics.tvl),
            format_usd(self.metrics.fees),
            LP_SIZE,
            self.ratio
        )
    }
}

/// Every bucket that currently has a live volume entry, with its totals.
pub async fn scan_buckets(store: &dyn MetricStore) -> Result<Vec<BucketReport>, StoreError> {
    let buckets = store
        .keys(&format!("{}*", MetricKind::Volume.prefix()))
        .await?
        .iter()
        .filter_map(|key| BucketKey::from_store_key(MetricKind::Volume, key))
        .unique()
        .collect::<Vec<_>>();

    debug!(target: "uni-volume::notify", "found {} buckets", buckets.len());

    let mut reports = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let metrics = BucketMetrics::read(store, &bucket).await?;
        let report = BucketReport::new(bucket, metrics);

        debug!(
            target: "uni-volume::notify",
            "bucket: {} - volume: {} tvl: {} fees: {} fee/tvl ratio: {}",
            report.bucket, metrics.volume, metrics.tvl, metrics.fees, report.ratio
        );

        reports.push(report);
    }

    Ok(reports)
}

/// Keeps buckets whose ratio is strictly above `threshold` and whose TVL is
/// above [`MIN_TVL`], highest ratio first. Ties keep their scan order.
pub fn rank_buckets(reports: Vec<BucketReport>, threshold: f64) -> Vec<BucketReport> {
    let mut kept = reports
        .into_iter()
        .filter(|r| r.ratio > threshold && r.metrics.tvl > MIN_TVL)
        .collect::<Vec<_>>();

    kept.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));

    kept
}

/// Every live key whose value, read as a plain number, is above `threshold`.
pub async fn scan_keys_over(
    store: &dyn MetricStore,
    threshold: f64,
) -> Result<Vec<(String, f64)>, StoreError> {
    let mut over = Vec::new();

    for key in store.keys("*").await? {
        let value = stored_f64(store.get(&key).await?);
        if value > threshold {
            over.push((key, value));
        }
    }

    Ok(over)
}

/// The notification mode this process runs in.
pub enum Notifier {
    Telegram(TelegramNotifier),
    Email(EmailNotifier),
}

impl Notifier {
    /// One notification tick. Never fails, everything is logged.
    pub async fn run_once(&self) {
        info!(target: "uni-volume::notify", "{}: checking and sending notification...", chrono::Utc::now().timestamp_millis());

        let result = match self {
            Notifier::Telegram(n) => n.notify().await,
            Notifier::Email(n) => n.notify().await,
        };

        match result {
            Ok(0) => debug!(target: "uni-volume::notify", "nothing to report"),
            Ok(sent) => info!(target: "uni-volume::notify", "sent {} notification(s)", sent),
            Err(e) => error!(target: "uni-volume::notify", "failed to scan the store - {:?}", e),
        }
    }
}
