use std::sync::Arc;

use fieldx::fxstruct;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::OrderCacheError;
use crate::error::Result;
use crate::key::CacheKey;
use crate::refresh::RefreshPool;
use crate::traits::BackingStore;
use crate::traits::Hydrator;
use crate::traits::RefreshObserver;
use crate::types::Lookup;
use crate::types::LookupState;
use crate::types::MarketOrder;

/// Read-through cache of market orders.
///
/// Entries younger than the freshness TTL are served as is. Older entries that are still in the backing store are
/// served too, while a background refresh replaces them. Missing entries are hydrated synchronously.
///
/// ```ignore
/// let cache = OrderCache::builder()
///     .store(Arc::new(RedisStore::connect(url).await?))
///     .config(CacheConfig::builder().build()?)
///     .hydrator(Arc::new(MarketHydrator::new(EsiClient::new()?).await?))
///     .build()?;
///
/// let orders = cache.orders_for_type(34, 10000002).await?;
/// ```
#[derive(Clone)]
#[fxstruct(
    no_new,
    default(off),
    builder(
        error(OrderCacheError),
        post_build,
        doc("Builder object of [`OrderCache`].", "", "See [`OrderCache::builder()`] method."),
        method_doc("Implement builder pattern for [`OrderCache`]."),
    )
)]
pub struct OrderCache {
    #[fieldx(builder(required))]
    store: Arc<dyn BackingStore>,

    /// Without a hydrator every miss is a [`NoHydrationSource`](OrderCacheError::NoHydrationSource) error.
    #[fieldx(optional)]
    hydrator: Arc<dyn Hydrator>,

    #[fieldx(optional)]
    observer: Arc<dyn RefreshObserver>,

    #[fieldx(builder(required, into))]
    config: Arc<CacheConfig>,

    #[fieldx(builder(off))]
    refresh: RefreshPool,
}

impl OrderCache {
    fn post_build(mut self) -> Result<Self> {
        self.config.validate()?;
        self.refresh = RefreshPool::new(self.config.refresh_workers());
        Ok(self)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Orders for the type in the region.
    pub async fn orders_for_type(&self, type_id: i64, region_id: i64) -> Result<Vec<MarketOrder>> {
        Ok(self.lookup(type_id, region_id).await?.orders)
    }

    /// Same as [`orders_for_type`](Self::orders_for_type), but also tells how the orders were obtained.
    #[instrument(level = "debug", skip(self))]
    pub async fn lookup(&self, type_id: i64, region_id: i64) -> Result<Lookup> {
        if type_id <= 0 || region_id <= 0 {
            return Err(OrderCacheError::InvalidArgument { type_id, region_id });
        }

        let key = self.config.key(type_id, region_id);

        let Some(bytes) = self.store.get(&key.to_string()).await?
        else {
            debug!("MISS({key})");
            return Ok(Lookup {
                orders: self.hydrate_and_store(&key).await?,
                state:  LookupState::Hydrated,
            });
        };

        let entry = CacheEntry::unpack(&bytes)?;

        if entry.is_fresh(self.config.freshness_ttl()) {
            debug!("HIT({key})");
            return Ok(Lookup {
                orders: entry.into_orders(),
                state:  LookupState::Fresh,
            });
        }

        debug!("STALE({key}), fetched at {}", entry.fetched_at());
        self.submit_refresh(key);

        Ok(Lookup {
            orders: entry.into_orders(),
            state:  LookupState::Stale,
        })
    }

    /// Wait for the background refreshes submitted so far to complete.
    pub async fn drain(&self) {
        self.refresh.drain().await;
    }

    pub fn pending_refreshes(&self) -> usize {
        self.refresh.pending()
    }

    fn submit_refresh(&self, key: CacheKey) {
        let cache = self.clone();
        self.refresh.submit(async move {
            match cache.hydrate_and_store(&key).await {
                Ok(orders) => {
                    debug!("Refreshed {key} with {} orders", orders.len());
                    if let Some(observer) = &cache.observer {
                        observer.on_refreshed(&key, orders.len()).await;
                    }
                }
                Err(err) => {
                    warn!("Background refresh of {key} failed: {err}");
                    if let Some(observer) = &cache.observer {
                        observer.on_refresh_error(&key, &err).await;
                    }
                }
            }
        });
    }

    async fn hydrate(&self, key: &CacheKey) -> Result<Vec<MarketOrder>> {
        let Some(hydrator) = &self.hydrator
        else {
            return Err(OrderCacheError::NoHydrationSource);
        };

        let hydration = hydrator.orders_for_type(key.type_id(), key.region_id());

        match self.config.hydrate_timeout() {
            Some(limit) => tokio::time::timeout(limit, hydration)
                .await
                .map_err(|_| OrderCacheError::Timeout(limit))?,
            None => hydration.await,
        }
    }

    // Hydration errors are returned. Failing to store the result is only reported: the orders are still good.
    async fn hydrate_and_store(&self, key: &CacheKey) -> Result<Vec<MarketOrder>> {
        let entry = CacheEntry::new(self.hydrate(key).await?);

        let stored = match entry.pack() {
            Ok(bytes) => {
                self.store
                    .set(&key.to_string(), &bytes, self.config.backing_ttl())
                    .await
            }
            Err(err) => Err(err),
        };

        if let Err(err) = stored {
            warn!("Failed to cache orders for {key}: {err}");
            if let Some(observer) = &self.observer {
                observer.on_store_error(key, &err).await;
            }
        }

        Ok(entry.into_orders())
    }
}

impl std::fmt::Debug for OrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCache")
            .field("config", &self.config)
            .field("hydrator", &self.hydrator.is_some())
            .field("observer", &self.observer.is_some())
            .field("pending_refreshes", &self.refresh.pending())
            .finish()
    }
}
