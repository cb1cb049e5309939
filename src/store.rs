use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use tokio::{sync::RwLock, time::Instant};
use tracing::info;

use crate::errors::StoreError;

/// Expiring key-value store shared by the aggregator and the notifier. Values
/// are stringified decimals.
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// writes `value` and resets the key's expiry to `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// live keys matching a glob `pattern` (only `*` is interpreted)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}

pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;

        info!(target: "uni-volume::store", "connected to redis");

        Ok(Self { connection })
    }
}

#[async_trait]
impl MetricStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs() as usize).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }
}

/// In-process store with the same expiry semantics as redis. Expiry runs on
/// the tokio clock, so a paused runtime controls it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        let now = Instant::now();

        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().await;
        let now = Instant::now();

        let mut keys = entries
            .iter()
            .filter(|(key, (_, expires_at))| *expires_at > now && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect::<Vec<_>>();
        keys.sort();

        Ok(keys)
    }
}

fn glob_match(pattern: &str, key: &str) -> bool {
    let parts = pattern.split('*').collect::<Vec<_>>();
    if parts.len() == 1 {
        return pattern == key;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };

    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", "volume_WETH-USDC_3000"));
        assert!(glob_match("volume_*", "volume_WETH-USDC_3000"));
        assert!(!glob_match("volume_*", "fees_WETH-USDC_3000"));
        assert!(glob_match("*_3000", "tvl_WETH-USDC_3000"));
        assert!(glob_match("v*_*-*", "volume_A-B"));
        assert!(!glob_match("ab*ba", "aba"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);

        store.set_ex("volume_A-B_500", "10", ttl).await.unwrap();
        store.set_ex("fees_A-B_500", "0.5", ttl).await.unwrap();
        store.set_ex("volume_A-B_500", "25", ttl).await.unwrap();

        assert_eq!(store.get("volume_A-B_500").await.unwrap().as_deref(), Some("25"));
        assert_eq!(store.get("tvl_A-B_500").await.unwrap(), None);
        assert_eq!(store.keys("volume_*").await.unwrap(), vec!["volume_A-B_500".to_string()]);
        assert_eq!(store.keys("*").await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();
        store
            .set_ex("volume_A-B_500", "10", Duration::from_secs(4 * 60 * 60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4 * 60 * 60 - 1)).await;
        assert_eq!(store.get("volume_A-B_500").await.unwrap().as_deref(), Some("10"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("volume_A-B_500").await.unwrap(), None);
        assert!(store.keys("*").await.unwrap().is_empty());
    }
}
