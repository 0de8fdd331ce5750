use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::Semaphore;

use ecorder::prelude::*;
use ecorder::store::MemoryStore;

const TRITANIUM: i64 = 34;
const THE_FORGE: i64 = 10000002;

fn order(order_id: i64, price: f64) -> MarketOrder {
    MarketOrder {
        order_id,
        type_id: TRITANIUM,
        region_id: THE_FORGE,
        system_id: 30000142,
        station_id: 60003760,
        price,
        bid: false,
        volume_remaining: 100,
        volume_entered: 100,
        min_volume: 1,
        range: RANGE_REGION,
        duration: 90,
        issued: Utc::now(),
    }
}

#[derive(Default)]
struct CountingStore {
    inner:    MemoryStore,
    gets:     AtomicUsize,
    sets:     AtomicUsize,
    fail_get: bool,
    fail_set: bool,
    last_ttl: Mutex<Option<Duration>>,
}

#[async_trait]
impl BackingStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, OrderCacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get {
            return Err(OrderCacheError::store("connection reset by peer"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), OrderCacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self.last_ttl.lock().unwrap() = Some(ttl);
        if self.fail_set {
            return Err(OrderCacheError::store("out of memory"));
        }
        self.inner.set(key, value, ttl).await
    }
}

struct ScriptedHydrator {
    orders: Vec<MarketOrder>,
    fail:   bool,
    // When set, each call waits for a permit.
    gate:   Option<Arc<Semaphore>>,
    calls:  AtomicUsize,
}

impl ScriptedHydrator {
    fn returning(orders: Vec<MarketOrder>) -> Self {
        Self {
            orders,
            fail: false,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(vec![])
        }
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Hydrator for ScriptedHydrator {
    async fn orders_for_type(&self, _type_id: i64, _region_id: i64) -> Result<Vec<MarketOrder>, OrderCacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail {
            return Err(OrderCacheError::source("market API returned 502"));
        }
        Ok(self.orders.clone())
    }

    async fn orders_for_region(&self, _region_id: i64) -> Result<Vec<MarketOrder>, OrderCacheError> {
        Err(OrderCacheError::NoHydrationSource)
    }
}

#[derive(Debug)]
enum Event {
    Refreshed(String, usize),
    RefreshFailed(String),
    StoreFailed(String),
}

struct ChannelObserver(mpsc::UnboundedSender<Event>);

#[async_trait]
impl RefreshObserver for ChannelObserver {
    async fn on_refreshed(&self, key: &CacheKey, orders: usize) {
        let _ = self.0.send(Event::Refreshed(key.to_string(), orders));
    }

    async fn on_refresh_error(&self, key: &CacheKey, _error: &OrderCacheError) {
        let _ = self.0.send(Event::RefreshFailed(key.to_string()));
    }

    async fn on_store_error(&self, key: &CacheKey, _error: &OrderCacheError) {
        let _ = self.0.send(Event::StoreFailed(key.to_string()));
    }
}

fn config() -> CacheConfig {
    CacheConfig::builder().build().unwrap()
}

fn builder_with(store: Arc<CountingStore>, hydrator: Option<Arc<ScriptedHydrator>>) -> OrderCacheBuilder {
    let builder = OrderCache::builder().store(store).config(config());
    match hydrator {
        Some(hydrator) => builder.hydrator(hydrator),
        None => builder,
    }
}

fn cache_with(store: Arc<CountingStore>, hydrator: Option<Arc<ScriptedHydrator>>) -> OrderCache {
    builder_with(store, hydrator).build().unwrap()
}

fn observed(builder: OrderCacheBuilder) -> (OrderCache, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (builder.observer(Arc::new(ChannelObserver(tx))).build().unwrap(), rx)
}

async fn put_entry(store: &CountingStore, entry: &CacheEntry) {
    let key = config().key(TRITANIUM, THE_FORGE).to_string();
    store
        .inner
        .set(&key, &entry.pack().unwrap(), Duration::from_secs(3600))
        .await
        .unwrap();
}

async fn stored_entry(store: &CountingStore) -> Option<CacheEntry> {
    let key = config().key(TRITANIUM, THE_FORGE).to_string();
    store
        .inner
        .get(&key)
        .await
        .unwrap()
        .map(|bytes| CacheEntry::unpack(&bytes).unwrap())
}

fn stale_entry(orders: Vec<MarketOrder>) -> CacheEntry {
    CacheEntry::with_timestamp(orders, Utc::now() - chrono::Duration::minutes(10))
}

#[tokio::test]
async fn invalid_ids_have_no_side_effects() {
    let store = Arc::new(CountingStore::default());
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(1, 100.0)]));
    let cache = cache_with(store.clone(), Some(hydrator.clone()));

    for (type_id, region_id) in [(0, THE_FORGE), (TRITANIUM, 0), (-34, THE_FORGE), (TRITANIUM, -1)] {
        let err = cache.orders_for_type(type_id, region_id).await.unwrap_err();
        assert!(
            matches!(err, OrderCacheError::InvalidArgument { .. }),
            "({type_id}, {region_id}) gave {err:?}"
        );
    }

    assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    assert_eq!(hydrator.calls(), 0);
}

#[tokio::test]
async fn miss_hydrates_stores_and_then_hits() {
    let store = Arc::new(CountingStore::default());
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(1, 100.0)]));
    let cache = cache_with(store.clone(), Some(hydrator.clone()));

    let first = cache.lookup(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(first.state, LookupState::Hydrated);
    assert_eq!(first.orders.len(), 1);
    assert_eq!(first.orders[0].order_id, 1);
    assert_eq!(first.orders[0].price, 100.0);
    assert_eq!(hydrator.calls(), 1);

    let entry = stored_entry(&store).await.expect("hydrated orders weren't stored");
    assert_eq!(entry.orders(), first.orders.as_slice());
    assert!((Utc::now() - entry.fetched_at()).num_seconds() < 5);
    assert_eq!(*store.last_ttl.lock().unwrap(), Some(Duration::from_secs(6 * 3600)));

    let second = cache.lookup(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(second.state, LookupState::Fresh);
    assert_eq!(second.orders, first.orders);
    assert_eq!(hydrator.calls(), 1);
    assert_eq!(cache.pending_refreshes(), 0);
}

#[tokio::test]
async fn fresh_entry_never_touches_hydrator() {
    let store = Arc::new(CountingStore::default());
    put_entry(&store, &CacheEntry::new(vec![order(5, 4.5), order(6, 4.6)])).await;
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(1, 100.0)]));
    let cache = cache_with(store.clone(), Some(hydrator.clone()));

    let orders = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(orders.iter().map(|o| o.order_id).collect::<Vec<_>>(), vec![5, 6]);

    cache.drain().await;
    assert_eq!(hydrator.calls(), 0);
    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_hydrator_and_empty_store() {
    let store = Arc::new(CountingStore::default());
    let cache = cache_with(store.clone(), None);

    let err = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap_err();
    assert!(matches!(err, OrderCacheError::NoHydrationSource));
    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    assert!(stored_entry(&store).await.is_none());
}

#[tokio::test]
async fn pre_populated_store_without_hydrator() {
    let store = Arc::new(CountingStore::default());
    put_entry(&store, &CacheEntry::new(vec![order(9, 1.0)])).await;
    let cache = OrderCache::builder()
        .store(store.clone())
        .config(config())
        .hydrator(Arc::new(NullHydrator))
        .build()
        .unwrap();

    let orders = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(orders[0].order_id, 9);
}

#[tokio::test]
async fn stale_entry_is_served_while_refreshing() {
    let store = Arc::new(CountingStore::default());
    put_entry(&store, &stale_entry(vec![order(1, 100.0)])).await;

    let gate = Arc::new(Semaphore::new(0));
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(2, 101.0), order(3, 99.0)]).gated(gate.clone()));
    let (cache, mut events) = observed(builder_with(store.clone(), Some(hydrator.clone())));

    // The hydrator can't complete until the gate opens, so getting here proves the caller wasn't blocked.
    let lookup = cache.lookup(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(lookup.state, LookupState::Stale);
    assert_eq!(lookup.orders.len(), 1);
    assert_eq!(lookup.orders[0].order_id, 1);
    assert_eq!(cache.pending_refreshes(), 1);

    gate.add_permits(1);
    cache.drain().await;

    assert_eq!(hydrator.calls(), 1);
    let refreshed = stored_entry(&store).await.unwrap();
    assert_eq!(refreshed.orders().len(), 2);
    assert_eq!(refreshed.orders()[0].order_id, 2);

    match events.recv().await {
        Some(Event::Refreshed(key, 2)) => assert_eq!(key, "ecorder/liveorders/2/34/10000002"),
        other => panic!("unexpected observer event: {other:?}"),
    }

    // The refreshed entry is fresh now.
    let lookup = cache.lookup(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(lookup.state, LookupState::Fresh);
    assert_eq!(hydrator.calls(), 1);
}

#[tokio::test]
async fn failed_background_refresh_is_swallowed() {
    let store = Arc::new(CountingStore::default());
    put_entry(&store, &stale_entry(vec![order(1, 100.0)])).await;
    let hydrator = Arc::new(ScriptedHydrator::failing());
    let (cache, mut events) = observed(builder_with(store.clone(), Some(hydrator.clone())));

    let orders = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(orders[0].order_id, 1);

    cache.drain().await;
    assert_eq!(hydrator.calls(), 1);
    assert!(matches!(events.recv().await, Some(Event::RefreshFailed(_))));

    // The stale entry stays in place.
    let entry = stored_entry(&store).await.unwrap();
    assert_eq!(entry.orders()[0].order_id, 1);
}

#[tokio::test]
async fn concurrent_stale_hits_are_not_deduplicated() {
    let store = Arc::new(CountingStore::default());
    put_entry(&store, &stale_entry(vec![order(1, 100.0)])).await;
    let gate = Arc::new(Semaphore::new(0));
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(2, 101.0)]).gated(gate.clone()));
    let cache = cache_with(store.clone(), Some(hydrator.clone()));

    cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap();
    cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(cache.pending_refreshes(), 2);

    gate.add_permits(2);
    cache.drain().await;
    assert_eq!(hydrator.calls(), 2);
}

#[tokio::test]
async fn store_errors_propagate() {
    let store = Arc::new(CountingStore {
        fail_get: true,
        ..Default::default()
    });
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(1, 100.0)]));
    let cache = cache_with(store.clone(), Some(hydrator.clone()));

    let err = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap_err();
    assert!(matches!(err, OrderCacheError::Store(_)));
    assert_eq!(hydrator.calls(), 0);
}

#[tokio::test]
async fn undecodable_entry_is_an_error() {
    let store = Arc::new(CountingStore::default());
    let key = config().key(TRITANIUM, THE_FORGE).to_string();
    store
        .inner
        .set(&key, b"\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff", Duration::from_secs(60))
        .await
        .unwrap();
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(1, 100.0)]));
    let cache = cache_with(store.clone(), Some(hydrator.clone()));

    let err = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap_err();
    assert!(matches!(err, OrderCacheError::Decode(_)));
    assert_eq!(hydrator.calls(), 0);
}

#[tokio::test]
async fn failed_set_still_returns_orders() {
    let store = Arc::new(CountingStore {
        fail_set: true,
        ..Default::default()
    });
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(1, 100.0)]));
    let (cache, mut events) = observed(builder_with(store.clone(), Some(hydrator.clone())));

    let orders = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(orders[0].order_id, 1);
    assert!(matches!(events.recv().await, Some(Event::StoreFailed(_))));

    // Nothing got cached, so the next call hydrates again.
    cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap();
    assert_eq!(hydrator.calls(), 2);
}

#[tokio::test]
async fn hydration_errors_propagate_on_miss() {
    let store = Arc::new(CountingStore::default());
    let hydrator = Arc::new(ScriptedHydrator::failing());
    let cache = cache_with(store.clone(), Some(hydrator.clone()));

    let err = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap_err();
    assert!(matches!(err, OrderCacheError::Source(_)));
    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hydration_deadline() {
    let store = Arc::new(CountingStore::default());
    let gate = Arc::new(Semaphore::new(0));
    let hydrator = Arc::new(ScriptedHydrator::returning(vec![order(1, 100.0)]).gated(gate));
    let config = CacheConfig::builder()
        .hydrate_timeout(Some(Duration::from_millis(20)))
        .build()
        .unwrap();
    let cache = OrderCache::builder()
        .store(store.clone())
        .config(config)
        .hydrator(hydrator.clone())
        .build()
        .unwrap();

    let err = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap_err();
    assert!(matches!(err, OrderCacheError::Timeout(_)));
    assert_eq!(store.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let config = CacheConfig::builder()
        .freshness_ttl(Duration::from_secs(600))
        .backing_ttl(Duration::from_secs(300))
        .build()
        .unwrap();
    let err = OrderCache::builder()
        .store(Arc::new(MemoryStore::default()))
        .config(config)
        .build()
        .unwrap_err();
    assert!(matches!(err, OrderCacheError::Config(_)));
}

#[tokio::test]
async fn store_is_required() {
    let err = OrderCache::builder().config(config()).build().unwrap_err();
    assert!(matches!(err, OrderCacheError::Config(ref msg) if msg.contains("store")));
}

struct CatalogOnlyApi {
    order_calls: AtomicUsize,
}

#[async_trait]
impl MarketApi for CatalogOnlyApi {
    async fn type_ids(&self) -> Result<Vec<i64>, OrderCacheError> {
        Ok(vec![TRITANIUM])
    }

    async fn region_ids(&self) -> Result<Vec<i64>, OrderCacheError> {
        Ok(vec![THE_FORGE])
    }

    async fn region_orders(&self, _region_id: i64, _type_id: i64) -> Result<Vec<ApiOrder>, OrderCacheError> {
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    }

    async fn region_all_orders(&self, _region_id: i64) -> Result<Vec<ApiOrder>, OrderCacheError> {
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    }
}

#[tokio::test]
async fn unfetchable_item_through_the_cache() {
    let api = Arc::new(CatalogOnlyApi {
        order_calls: AtomicUsize::new(0),
    });
    let hydrator = MarketHydrator::from_shared(api.clone()).await.unwrap();
    let store = Arc::new(MemoryStore::default());
    let cache = OrderCache::builder()
        .store(store.clone())
        .config(config())
        .hydrator(Arc::new(hydrator))
        .build()
        .unwrap();

    let err = cache.orders_for_type(35, THE_FORGE).await.unwrap_err();
    assert!(matches!(err, OrderCacheError::UnfetchableItem { type_id: 35, .. }));
    assert_eq!(api.order_calls.load(Ordering::SeqCst), 0);

    // A known pair with no orders is a legitimate, cacheable empty result.
    let orders = cache.orders_for_type(TRITANIUM, THE_FORGE).await.unwrap();
    assert!(orders.is_empty());
    assert_eq!(api.order_calls.load(Ordering::SeqCst), 1);
    assert!(store.contains("ecorder/liveorders/2/34/10000002").await);
}
