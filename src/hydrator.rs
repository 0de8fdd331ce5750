//! Hydration sources.
//!
//! Hydrators compose by wrapping: [`DatabaseHydrator`] decorates any other hydrator, typically a [`MarketHydrator`].
//!
//! ```ignore
//! let market = MarketHydrator::new(EsiClient::new()).await?;
//! let hydrator = DatabaseHydrator::new(order_store, Arc::new(market), Duration::from_secs(3600));
//! ```
pub mod database;
pub mod market;

use async_trait::async_trait;

use crate::error::OrderCacheError;
use crate::error::Result;
use crate::traits::Hydrator;
use crate::types::MarketOrder;

pub use database::DatabaseHydrator;
pub use market::Catalog;
pub use market::MarketHydrator;

/// The configured absence of a hydration source.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHydrator;

#[async_trait]
impl Hydrator for NullHydrator {
    async fn orders_for_type(&self, _type_id: i64, _region_id: i64) -> Result<Vec<MarketOrder>> {
        Err(OrderCacheError::NoHydrationSource)
    }

    async fn orders_for_region(&self, _region_id: i64) -> Result<Vec<MarketOrder>> {
        Err(OrderCacheError::NoHydrationSource)
    }
}
