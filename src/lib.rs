//! # ecorder
//!
//! Read-through cache of live market orders, keyed by item type and region.
//!
//! Fetching orders from the market API is slow, so every `(type, region)` pair gets cached in a key-value
//! [backing store](traits::BackingStore) (redis in production). When an entry is missing, it is *hydrated*: a
//! [`Hydrator`](traits::Hydrator) fetches fresh orders which are then stored and returned.
//!
//! # Freshness
//!
//! Two TTLs are involved:
//!
//! | TTL | Default | Meaning |
//! | --- | ------- | ------- |
//! | freshness | 5 min | Entries younger than this are returned as is. |
//! | backing | 6 h | Expiration of the entry in the backing store. |
//!
//! Between the two, entries are *stale but servable*: the caller gets the stale orders right away and a background
//! refresh replaces the entry for the next callers (stale-while-revalidate). Failures of background refreshes never
//! reach the caller; they are logged and reported to an optional [`RefreshObserver`](traits::RefreshObserver).
//!
//! # Hydrators
//!
//! - [`MarketHydrator`](hydrator::MarketHydrator) fetches from the market API. It validates type and region IDs
//!   against a catalog snapshot taken when it is constructed.
//! - [`DatabaseHydrator`](hydrator::DatabaseHydrator) consults durable storage first and falls back to another
//!   hydrator, persisting what it returns.
//! - [`NullHydrator`](hydrator::NullHydrator) stands for no hydration source at all.
//!
//! ```ignore
//! let store = Arc::new(RedisStore::connect("redis://127.0.0.1/").await?);
//! let market = MarketHydrator::new(EsiClient::new()?).await?;
//! let cache = OrderCache::builder()
//!     .store(store)
//!     .config(CacheConfig::builder().build()?)
//!     .hydrator(Arc::new(market))
//!     .build()?;
//!
//! let orders = cache.orders_for_type(34, 10000002).await?;
//! ```

pub mod cache;
pub mod config;
#[cfg(feature = "sqlite")]
pub mod db;
pub mod entry;
pub mod error;
#[cfg(feature = "esi")]
pub mod esi;
pub mod hydrator;
pub mod key;
pub mod refresh;
pub mod store;
pub mod traits;
pub mod types;

#[doc(inline)]
pub use cache::OrderCache;
#[doc(inline)]
pub use error::OrderCacheError;

pub mod prelude {
    pub use crate::cache::OrderCache;
    pub use crate::cache::OrderCacheBuilder;
    pub use crate::config::CacheConfig;
    pub use crate::entry::CacheEntry;
    pub use crate::error::OrderCacheError;
    pub use crate::hydrator::DatabaseHydrator;
    pub use crate::hydrator::MarketHydrator;
    pub use crate::hydrator::NullHydrator;
    pub use crate::key::CacheKey;
    pub use crate::traits::*;
    pub use crate::types::*;
}
