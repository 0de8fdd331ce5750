use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::Result;
use clap::Parser;
use fieldx::fxstruct;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ecorder::esi::EsiClient;
use ecorder::esi::DEFAULT_BASE_URL;
use ecorder::prelude::*;
use ecorder::store::RedisStore;

#[derive(Debug, Clone, clap::Parser)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, name = "ecorder")]
struct Cli {
    /// Item type to look orders up for.
    type_id: i64,

    /// Region to look orders up in.
    region_id: i64,

    /// Redis server holding the cached orders.
    #[fieldx(get(clone))]
    #[clap(long, env = "ECORDER_REDIS_URL", default_value = "redis://127.0.0.1/")]
    redis_url: String,

    /// Base URL of the market API.
    #[fieldx(get(clone))]
    #[clap(long, env = "ECORDER_ESI_URL", default_value = DEFAULT_BASE_URL)]
    esi_url: String,

    /// Seconds an entry is served without refreshing.
    #[clap(long, env = "ECORDER_FRESHNESS_SECS", default_value_t = 300)]
    freshness_secs: u64,

    /// Seconds an entry is kept in redis.
    #[clap(long, env = "ECORDER_BACKING_SECS", default_value_t = 21600)]
    backing_secs: u64,

    /// Maximum number of concurrent background refreshes.
    #[clap(long, env = "ECORDER_REFRESH_WORKERS", default_value_t = 16)]
    refresh_workers: usize,

    /// Give up on the market API after this many seconds. 0 means wait forever.
    #[clap(long, env = "ECORDER_HYDRATE_TIMEOUT_SECS", default_value_t = 0)]
    hydrate_timeout_secs: u64,

    /// Run without the market API, serving only what is already cached.
    #[clap(long, env = "ECORDER_OFFLINE", default_value_t = false)]
    offline: bool,
}

impl Cli {
    fn cache_config(&self) -> Result<CacheConfig> {
        let hydrate_timeout =
            (self.hydrate_timeout_secs() > 0).then(|| Duration::from_secs(self.hydrate_timeout_secs()));

        CacheConfig::builder()
            .freshness_ttl(Duration::from_secs(self.freshness_secs()))
            .backing_ttl(Duration::from_secs(self.backing_secs()))
            .refresh_workers(self.refresh_workers())
            .hydrate_timeout(hydrate_timeout)
            .build()
            .map_err(|err| anyhow!("cache configuration: {err}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = Arc::new(RedisStore::connect(&cli.redis_url()).await?);
    let mut builder = OrderCache::builder().store(store).config(cli.cache_config()?);

    if cli.offline() {
        warn!("Offline mode, cache misses won't be hydrated");
    }
    else {
        info!("Building a catalog of the universe");
        let market = MarketHydrator::new(EsiClient::with_base_url(cli.esi_url())?).await?;
        builder = builder.hydrator(Arc::new(market));
    }

    let cache = builder.build()?;

    let lookup = cache.lookup(cli.type_id(), cli.region_id()).await?;
    info!("{} orders ({:?})", lookup.orders.len(), lookup.state);
    println!("{}", serde_json::to_string_pretty(&lookup.orders)?);

    // Let a stale entry get refreshed before exiting.
    cache.drain().await;

    Ok(())
}
