use std::time::Duration;

use fieldx::fxstruct;

use crate::entry::SCHEMA_VERSION;
use crate::error::OrderCacheError;
use crate::error::Result;
use crate::key::CacheKey;

pub const DEFAULT_NAMESPACE: &str = "ecorder/liveorders";

/// Per-instance cache settings.
///
/// ```ignore
/// let config = CacheConfig::builder()
///     .freshness_ttl(Duration::from_secs(60))
///     .backing_ttl(Duration::from_secs(3600))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
#[fxstruct(no_new, builder, get(copy))]
pub struct CacheConfig {
    /// Key prefix, the schema version and the IDs are appended to it.
    #[fieldx(get(copy(off)), default(DEFAULT_NAMESPACE.to_string()))]
    namespace:       String,
    #[fieldx(default(SCHEMA_VERSION))]
    schema_version:  u32,
    /// Maximum age of an entry served without a refresh.
    #[fieldx(default(Duration::from_secs(300)))]
    freshness_ttl:   Duration,
    /// Expiration of entries in the backing store. Must not be shorter than `freshness_ttl`: the difference is the
    /// window where stale entries are still served.
    #[fieldx(default(Duration::from_secs(6 * 3600)))]
    backing_ttl:     Duration,
    /// Number of background refreshes allowed to run at once.
    #[fieldx(default(16))]
    refresh_workers: usize,
    /// Fail hydrations taking longer than this. No limit by default, in which case a hung hydration source keeps its
    /// background refresh slot forever and stale hits keep queueing refreshes behind it.
    #[fieldx(default(None))]
    hydrate_timeout: Option<Duration>,
}

impl CacheConfig {
    pub fn key(&self, type_id: i64, region_id: i64) -> CacheKey {
        CacheKey::new(self.namespace.as_str(), self.schema_version, type_id, region_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backing_ttl < self.freshness_ttl {
            return Err(OrderCacheError::Config(format!(
                "backing TTL {:?} is shorter than freshness TTL {:?}",
                self.backing_ttl, self.freshness_ttl
            )));
        }
        if self.refresh_workers == 0 {
            return Err(OrderCacheError::Config("at least one refresh worker is required".into()));
        }
        if self.namespace.is_empty() {
            return Err(OrderCacheError::Config("empty key namespace".into()));
        }
        Ok(())
    }
}
