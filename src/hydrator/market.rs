use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;
use tracing::instrument;

use crate::error::OrderCacheError;
use crate::error::Result;
use crate::traits::Hydrator;
use crate::traits::MarketApi;
use crate::types::range_to_jumps;
use crate::types::ApiOrder;
use crate::types::MarketOrder;

/// Snapshot of the type and region IDs the market knows about.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types:   HashSet<i64>,
    regions: HashSet<i64>,
}

impl Catalog {
    pub fn new(types: impl IntoIterator<Item = i64>, regions: impl IntoIterator<Item = i64>) -> Self {
        Self {
            types:   types.into_iter().collect(),
            regions: regions.into_iter().collect(),
        }
    }

    /// Both fetches must succeed, there is no partially initialized catalog.
    pub async fn fetch<API: MarketApi + ?Sized>(api: &API) -> Result<Self> {
        let types = api.type_ids().await?;
        let regions = api.region_ids().await?;
        info!("Market catalog loaded: {} types, {} regions", types.len(), regions.len());
        Ok(Self::new(types, regions))
    }

    pub fn has_type(&self, type_id: i64) -> bool {
        self.types.contains(&type_id)
    }

    pub fn has_region(&self, region_id: i64) -> bool {
        self.regions.contains(&region_id)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

/// Hydrates straight from the market API.
pub struct MarketHydrator<API>
where
    API: MarketApi,
{
    api:     Arc<API>,
    catalog: Catalog,
}

impl<API> MarketHydrator<API>
where
    API: MarketApi,
{
    /// Fetches the catalog first. Any failure to do so fails the construction.
    pub async fn new(api: API) -> Result<Self> {
        Self::from_shared(Arc::new(api)).await
    }

    pub async fn from_shared(api: Arc<API>) -> Result<Self> {
        let catalog = Catalog::fetch(api.as_ref()).await?;
        Ok(Self { api, catalog })
    }

    pub fn with_catalog(api: Arc<API>, catalog: Catalog) -> Self {
        Self { api, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn to_market_order(region_id: i64, order: ApiOrder) -> MarketOrder {
        MarketOrder {
            order_id: order.order_id,
            type_id: order.type_id,
            region_id,
            system_id: order.system_id,
            station_id: order.location_id,
            price: order.price,
            bid: order.is_buy_order,
            volume_remaining: order.volume_remain,
            volume_entered: order.volume_total,
            min_volume: order.min_volume,
            range: range_to_jumps(&order.range),
            duration: order.duration,
            issued: order.issued,
        }
    }
}

#[async_trait]
impl<API> Hydrator for MarketHydrator<API>
where
    API: MarketApi,
{
    #[instrument(level = "debug", skip(self))]
    async fn orders_for_type(&self, type_id: i64, region_id: i64) -> Result<Vec<MarketOrder>> {
        if !(self.catalog.has_type(type_id) && self.catalog.has_region(region_id)) {
            return Err(OrderCacheError::UnfetchableItem { type_id, region_id });
        }

        let orders = self.api.region_orders(region_id, type_id).await?;
        debug!("Market returned {} orders", orders.len());

        Ok(orders
            .into_iter()
            .map(|o| Self::to_market_order(region_id, o))
            .collect())
    }

    #[instrument(level = "debug", skip(self))]
    async fn orders_for_region(&self, region_id: i64) -> Result<Vec<MarketOrder>> {
        if !self.catalog.has_region(region_id) {
            return Err(OrderCacheError::UnfetchableRegion { region_id });
        }

        let orders = self.api.region_all_orders(region_id).await?;
        debug!("Market returned {} orders for the region", orders.len());

        Ok(orders
            .into_iter()
            .map(|o| Self::to_market_order(region_id, o))
            .collect())
    }
}

impl<API> Debug for MarketHydrator<API>
where
    API: MarketApi,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketHydrator")
            .field("types", &self.catalog.type_count())
            .field("regions", &self.catalog.region_count())
            .finish()
    }
}
