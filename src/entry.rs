use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::OrderCacheError;
use crate::error::Result;
use crate::types::MarketOrder;

/// Schema version of the postcard encoding below. Bump it with any change to [`CacheEntry`] or [`MarketOrder`].
pub const SCHEMA_VERSION: u32 = 2;

/// The unit of cached state: the verbatim result of a single hydration and the moment it was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    orders:     Vec<MarketOrder>,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(orders: Vec<MarketOrder>) -> Self {
        Self::with_timestamp(orders, Utc::now())
    }

    pub fn with_timestamp(orders: Vec<MarketOrder>, fetched_at: DateTime<Utc>) -> Self {
        Self { orders, fetched_at }
    }

    pub fn orders(&self) -> &[MarketOrder] {
        &self.orders
    }

    pub fn into_orders(self) -> Vec<MarketOrder> {
        self.orders
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// An entry is fresh while its age doesn't exceed `ttl`. Entries from the future (clock skew) are fresh.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age <= ttl,
            // Out of chrono's range means "forever".
            Err(_) => true,
        }
    }

    pub fn pack(&self) -> Result<Vec<u8>> {
        postcard::to_stdvec(self).map_err(OrderCacheError::Encode)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(OrderCacheError::Decode)
    }
}
