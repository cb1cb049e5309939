use serde::{Deserialize, Serialize};

use crate::{
    aggregator::BucketKey,
    errors::FetchError,
    utils::{lossy_f64, serde_lenient_string, serde_null_default, serde_str_u64},
};

/// fee tier used for pairs whose schema carries none
pub const UNKNOWN_FEE_TIER: &str = "unknownFeeTier";

/// symbol used when the indexer returns a swap without its token
pub const UNKNOWN_SYMBOL: &str = "unknown";

#[derive(Debug, Clone, Serialize)]
pub struct GraphRequest {
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphResponse<T> {
    pub data: Option<SwapsData<T>>,
    #[serde(default)]
    pub errors: Vec<GraphError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapsData<T> {
    pub swaps: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphError {
    pub message: String,
}

impl<T> GraphResponse<T> {
    pub fn into_swaps(self) -> Result<Vec<T>, FetchError> {
        if !self.errors.is_empty() {
            let messages = self
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FetchError::Graph(messages));
        }

        self.data
            .map(|d| d.swaps)
            .ok_or(FetchError::EmptyResponse)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub symbol: Option<String>,
}

impl Token {
    pub fn symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or(UNKNOWN_SYMBOL)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct V2Pair {
    #[serde(default, deserialize_with = "serde_null_default::deserialize")]
    pub token0: Token,
    #[serde(default, deserialize_with = "serde_null_default::deserialize")]
    pub token1: Token,
    #[serde(rename = "reserveUSD", default, deserialize_with = "serde_lenient_string::deserialize")]
    pub reserve_usd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct V3Pool {
    #[serde(default, deserialize_with = "serde_null_default::deserialize")]
    pub token0: Token,
    #[serde(default, deserialize_with = "serde_null_default::deserialize")]
    pub token1: Token,
    #[serde(
        rename = "totalValueLockedUSD",
        default,
        deserialize_with = "serde_lenient_string::deserialize"
    )]
    pub total_value_locked_usd: Option<String>,
    #[serde(rename = "feeTier", default, deserialize_with = "serde_lenient_string::deserialize")]
    pub fee_tier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SwapV2 {
    pub id: String,
    #[serde(rename = "amountUSD", default, deserialize_with = "serde_lenient_string::deserialize")]
    pub amount_usd: Option<String>,
    #[serde(deserialize_with = "serde_str_u64::deserialize")]
    pub timestamp: u64,
    /// a swap whose pair the indexer can't resolve still counts, under unknown symbols
    #[serde(default, deserialize_with = "serde_null_default::deserialize")]
    pub pair: V2Pair,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SwapV3 {
    pub id: String,
    #[serde(rename = "amountUSD", default, deserialize_with = "serde_lenient_string::deserialize")]
    pub amount_usd: Option<String>,
    #[serde(deserialize_with = "serde_str_u64::deserialize")]
    pub timestamp: u64,
    #[serde(default, deserialize_with = "serde_null_default::deserialize")]
    pub pool: V3Pool,
}

/// A swap as returned by whichever subgraph is configured.
#[derive(Debug, Clone, PartialEq)]
pub enum Swap {
    V2(SwapV2),
    V3(SwapV3),
}

impl Swap {
    pub fn timestamp(&self) -> u64 {
        match self {
            Swap::V2(s) => s.timestamp,
            Swap::V3(s) => s.timestamp,
        }
    }

    /// Flattens either shape into the record the aggregator works on.
    pub fn normalize(self) -> SwapRecord {
        match self {
            Swap::V2(s) => SwapRecord {
                id: s.id,
                bucket: BucketKey::new(
                    s.pair.token0.symbol(),
                    s.pair.token1.symbol(),
                    UNKNOWN_FEE_TIER,
                ),
                amount_usd: lossy_f64(s.amount_usd.as_deref()),
                liquidity_usd: lossy_f64(s.pair.reserve_usd.as_deref()),
                timestamp: s.timestamp,
            },
            Swap::V3(s) => SwapRecord {
                id: s.id,
                bucket: BucketKey::new(
                    s.pool.token0.symbol(),
                    s.pool.token1.symbol(),
                    s.pool.fee_tier.as_deref().unwrap_or(UNKNOWN_FEE_TIER),
                ),
                amount_usd: lossy_f64(s.amount_usd.as_deref()),
                liquidity_usd: lossy_f64(s.pool.total_value_locked_usd.as_deref()),
                timestamp: s.timestamp,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapRecord {
    pub id: String,
    pub bucket: BucketKey,
    pub amount_usd: f64,
    /// reserveUSD for v2 pairs, totalValueLockedUSD for v3 pools
    pub liquidity_usd: f64,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const V2_RESPONSE: &str = r#"{
        "data": {
            "swaps": [
                {
                    "id": "0xabc-0",
                    "pair": {
                        "token0": { "symbol": "WETH" },
                        "token1": { "symbol": "USDT" },
                        "reserveUSD": "81234567.12"
                    },
                    "amountUSD": "1520.5",
                    "timestamp": "1700000100"
                }
            ]
        }
    }"#;

    const V3_RESPONSE: &str = r#"{
        "data": {
            "swaps": [
                {
                    "id": "0xdef-3",
                    "pool": {
                        "token0": { "symbol": "USDC" },
                        "token1": { "symbol": "WETH" },
                        "totalValueLockedUSD": "250000000.5",
                        "feeTier": "500"
                    },
                    "amountUSD": "100000",
                    "timestamp": "1700000200"
                }
            ]
        }
    }"#;

    #[test]
    fn test_v2_normalize() {
        let response: GraphResponse<SwapV2> = serde_json::from_str(V2_RESPONSE).unwrap();
        let swaps = response.into_swaps().unwrap();
        assert_eq!(swaps.len(), 1);

        let record = Swap::V2(swaps[0].clone()).normalize();
        assert_eq!(record.id, "0xabc-0");
        assert_eq!(record.bucket.to_string(), "WETH-USDT_unknownFeeTier");
        assert_eq!(record.amount_usd, 1520.5);
        assert_eq!(record.liquidity_usd, 81234567.12);
        assert_eq!(record.timestamp, 1_700_000_100);
    }

    #[test]
    fn test_v3_normalize() {
        let response: GraphResponse<SwapV3> = serde_json::from_str(V3_RESPONSE).unwrap();
        let swap = Swap::V3(response.into_swaps().unwrap().remove(0));
        assert_eq!(swap.timestamp(), 1_700_000_200);

        let record = swap.normalize();
        assert_eq!(record.bucket.to_string(), "USDC-WETH_500");
        assert_eq!(record.bucket.fee_tier(), "500");
        assert_eq!(record.amount_usd, 100000.0);
        assert_eq!(record.liquidity_usd, 250000000.5);
    }

    #[test]
    fn test_v3_missing_fee_tier() {
        let raw = r#"{
            "id": "0x1",
            "pool": {
                "token0": { "symbol": "A" },
                "token1": { "symbol": "B" },
                "totalValueLockedUSD": "not-a-number"
            },
            "amountUSD": "10",
            "timestamp": 5
        }"#;
        let record = Swap::V3(serde_json::from_str(raw).unwrap()).normalize();

        assert_eq!(record.bucket.fee_tier(), UNKNOWN_FEE_TIER);
        assert!(record.liquidity_usd.is_nan());
    }

    #[test]
    fn test_null_relations_degrade() {
        let raw = r#"{
            "data": {
                "swaps": [
                    { "id": "0x1", "pair": null, "amountUSD": "10", "timestamp": "1700000001" },
                    {
                        "id": "0x2",
                        "pair": { "token0": { "symbol": null }, "token1": { "symbol": "WETH" }, "reserveUSD": "5" },
                        "amountUSD": "20",
                        "timestamp": "1700000002"
                    },
                    { "id": "0x3", "pair": { "token0": null }, "amountUSD": "30", "timestamp": "1700000003" }
                ]
            }
        }"#;
        let response: GraphResponse<SwapV2> = serde_json::from_str(raw).unwrap();
        let records = response
            .into_swaps()
            .unwrap()
            .into_iter()
            .map(|s| Swap::V2(s).normalize())
            .collect::<Vec<_>>();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].bucket.pair(), "unknown-unknown");
        assert!(records[0].liquidity_usd.is_nan());
        assert_eq!(records[1].bucket.pair(), "unknown-WETH");
        assert_eq!(records[1].liquidity_usd, 5.0);
        assert_eq!(records[2].bucket.pair(), "unknown-unknown");
        assert_eq!(records[2].timestamp, 1_700_000_003);

        let raw = r#"{ "id": "0x4", "pool": null, "amountUSD": "1", "timestamp": 9 }"#;
        let record = Swap::V3(serde_json::from_str(raw).unwrap()).normalize();
        assert_eq!(record.bucket.to_string(), "unknown-unknown_unknownFeeTier");
    }

    #[test]
    fn test_graph_errors() {
        let raw = r#"{ "errors": [ { "message": "indexer behind" }, { "message": "bad query" } ] }"#;
        let response: GraphResponse<SwapV3> = serde_json::from_str(raw).unwrap();

        match response.into_swaps() {
            Err(FetchError::Graph(msg)) => assert_eq!(msg, "indexer behind; bad query"),
            other => panic!("expected graph error, got {other:?}"),
        }

        let response: GraphResponse<SwapV3> = serde_json::from_str("{}").unwrap();
        assert!(matches!(response.into_swaps(), Err(FetchError::EmptyResponse)));
    }
}
