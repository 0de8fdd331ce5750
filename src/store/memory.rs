use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use moka::Expiry;

use crate::error::Result;
use crate::traits::BackingStore;

#[derive(Clone, Debug)]
struct StoredValue {
    bytes: Arc<[u8]>,
    ttl:   Duration,
}

// Every value expires after the TTL it was set with.
struct PerValueTtl;

impl Expiry<String, StoredValue> for PerValueTtl {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process backing store over a moka cache. Handy for single-node deployments and tests.
#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<String, StoredValue>,
}

impl MemoryStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .name("ecorder-memory-store")
                .max_capacity(max_capacity)
                .eviction_policy(EvictionPolicy::tiny_lfu())
                .expire_after(PerValueTtl)
                .build(),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.cache.get(key).await.is_some()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|v| v.bytes.to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.cache
            .insert(
                key.to_string(),
                StoredValue {
                    bytes: Arc::from(value),
                    ttl,
                },
            )
            .await;
        Ok(())
    }
}
