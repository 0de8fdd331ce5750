use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use std::time::Duration;

use crate::error::OrderCacheError;
use crate::error::Result;
use crate::key::CacheKey;
use crate::types::ApiOrder;
use crate::types::MarketOrder;

/// Key-value storage with per-key expiration the cache keeps its entries in.
#[async_trait]
pub trait BackingStore: Send + Sync + 'static {
    /// `Ok(None)` is a miss. Errors are reserved for transport and protocol failures.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
}

/// A source of fresh orders, invoked on cache misses and for refreshing stale entries.
///
/// Implementations are shared between concurrent refreshes of different keys.
#[async_trait]
pub trait Hydrator: Send + Sync + 'static {
    async fn orders_for_type(&self, type_id: i64, region_id: i64) -> Result<Vec<MarketOrder>>;
    /// Every order in the region, regardless of its type.
    async fn orders_for_region(&self, region_id: i64) -> Result<Vec<MarketOrder>>;
}

/// Client of the external market data service.
#[async_trait]
pub trait MarketApi: Send + Sync + 'static {
    /// All item type IDs the market knows about.
    async fn type_ids(&self) -> Result<Vec<i64>>;
    /// All region IDs the market knows about.
    async fn region_ids(&self) -> Result<Vec<i64>>;
    /// Buy and sell orders for a type in a region.
    async fn region_orders(&self, region_id: i64, type_id: i64) -> Result<Vec<ApiOrder>>;
    /// Buy and sell orders for all types in a region.
    async fn region_all_orders(&self, region_id: i64) -> Result<Vec<ApiOrder>>;
}

/// Orders persisted in durable storage along with the time they were saved.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub orders:   Vec<MarketOrder>,
    pub saved_at: DateTime<Utc>,
}

/// Durable per type/region order storage consulted by
/// [`DatabaseHydrator`](crate::hydrator::database::DatabaseHydrator).
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    async fn load(&self, type_id: i64, region_id: i64) -> Result<Option<OrderSnapshot>>;
    async fn save(&self, type_id: i64, region_id: i64, orders: &[MarketOrder]) -> Result<()>;
}

/// Receives the outcomes the cache can't report to its callers: background refreshes and failed writes to the backing
/// store.
#[async_trait]
pub trait RefreshObserver: Send + Sync + 'static {
    async fn on_refreshed(&self, _key: &CacheKey, _orders: usize) {}
    async fn on_refresh_error(&self, _key: &CacheKey, _error: &OrderCacheError) {}
    async fn on_store_error(&self, _key: &CacheKey, _error: &OrderCacheError) {}
}
