use std::{fmt, sync::Arc, time::Duration};

use tracing::{debug, info};

use crate::{
    errors::StoreError,
    graph::SwapRecord,
    store::MetricStore,
    utils::{lossy_f64, stored_f64},
};

/// every aggregate write pushes the key's expiry out to this
pub const AGGREGATE_TTL: Duration = Duration::from_secs(4 * 60 * 60);

/// Fee tiers are quoted in hundredths of a basis point (3000 = 0.30%).
pub const FEE_TIER_DENOMINATOR: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Volume,
    Fees,
    Tvl,
}

impl MetricKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            MetricKind::Volume => "volume_",
            MetricKind::Fees => "fees_",
            MetricKind::Tvl => "tvl_",
        }
    }
}

/// Aggregation bucket, rendered as `{token0}-{token1}_{feeTier}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pair: String,
    fee_tier: String,
}

impl BucketKey {
    pub fn new(token0: &str, token1: &str, fee_tier: &str) -> Self {
        Self {
            pair: format!("{token0}-{token1}"),
            fee_tier: fee_tier.to_string(),
        }
    }

    /// Recovers the bucket from a store key such as `volume_WETH-USDC_3000`.
    pub fn from_store_key(kind: MetricKind, key: &str) -> Option<Self> {
        let (pair, fee_tier) = key.strip_prefix(kind.prefix())?.rsplit_once('_')?;

        Some(Self {
            pair: pair.to_string(),
            fee_tier: fee_tier.to_string(),
        })
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn fee_tier(&self) -> &str {
        &self.fee_tier
    }

    pub fn store_key(&self, kind: MetricKind) -> String {
        format!("{}{self}", kind.prefix())
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.pair, self.fee_tier)
    }
}

/// Running totals for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketMetrics {
    pub volume: f64,
    pub fees: f64,
    pub tvl: f64,
}

impl BucketMetrics {
    /// missing or expired entries read as zero
    pub async fn read(store: &dyn MetricStore, bucket: &BucketKey) -> Result<Self, StoreError> {
        let volume = stored_f64(store.get(&bucket.store_key(MetricKind::Volume)).await?);
        let fees = stored_f64(store.get(&bucket.store_key(MetricKind::Fees)).await?);
        let tvl = stored_f64(store.get(&bucket.store_key(MetricKind::Tvl)).await?);

        Ok(Self { volume, fees, tvl })
    }

    async fn write(&self, store: &dyn MetricStore, bucket: &BucketKey) -> Result<(), StoreError> {
        for (kind, value) in [
            (MetricKind::Volume, self.volume),
            (MetricKind::Tvl, self.tvl),
            (MetricKind::Fees, self.fees),
        ] {
            store
                .set_ex(&bucket.store_key(kind), &value.to_string(), AGGREGATE_TTL)
                .await?;
        }

        Ok(())
    }

    /// fee yield of a fixed size LP position, zero when there is no liquidity
    pub fn fee_ratio(&self, lp_size: f64) -> f64 {
        if self.tvl != 0.0 {
            (self.fees / self.tvl) * lp_size
        } else {
            0.0
        }
    }
}

/// Fees earned on `volume_usd` at `fee_tier`. A fee tier that isn't a number
/// yields NaN.
pub fn fee_delta(volume_usd: f64, fee_tier: &str) -> f64 {
    volume_usd * lossy_f64(Some(fee_tier)) / FEE_TIER_DENOMINATOR
}

/// Folds swaps into the per-bucket totals held in the store.
pub struct VolumeAggregator {
    store: Arc<dyn MetricStore>,
}

impl VolumeAggregator {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Applies every swap in order. Stops at the first store failure, swaps
    /// already applied stay applied.
    pub async fn apply(&self, swaps: &[SwapRecord]) -> Result<(), StoreError> {
        for swap in swaps {
            self.apply_swap(swap).await?;
        }

        info!(target: "uni-volume::aggregator", "aggregated {} swaps", swaps.len());

        Ok(())
    }

    async fn apply_swap(&self, swap: &SwapRecord) -> Result<(), StoreError> {
        let store = self.store.as_ref();
        let current = BucketMetrics::read(store, &swap.bucket).await?;

        let updated = BucketMetrics {
            volume: current.volume + swap.amount_usd,
            fees: current.fees + fee_delta(swap.amount_usd, swap.bucket.fee_tier()),
            // liquidity is summed per swap, not replaced
            tvl: current.tvl + swap.liquidity_usd,
        };
        updated.write(store, &swap.bucket).await?;

        debug!(target: "uni-volume::aggregator", "swap {} -> {}: {:?}", swap.id, swap.bucket, updated);

        Ok(())
    }
}
