use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::error::Result;
use crate::traits::Hydrator;
use crate::traits::OrderSnapshot;
use crate::traits::OrderStore;
use crate::types::MarketOrder;

/// Database-first hydrator.
///
/// The order is fixed: the [`OrderStore`] is consulted first and its snapshot is used if it isn't older than
/// `max_age`. Otherwise the inner hydrator is called and whatever it returns is written through to the store. Store
/// failures never fail a hydration; they only make the inner hydrator do the work.
///
/// Snapshots are kept per type and region, so region-wide hydration is passed straight to the inner hydrator.
pub struct DatabaseHydrator {
    store:   Arc<dyn OrderStore>,
    inner:   Arc<dyn Hydrator>,
    max_age: Duration,
}

impl DatabaseHydrator {
    pub fn new(store: Arc<dyn OrderStore>, inner: Arc<dyn Hydrator>, max_age: Duration) -> Self {
        Self { store, inner, max_age }
    }

    fn is_usable(&self, snapshot: &OrderSnapshot) -> bool {
        let age = Utc::now().signed_duration_since(snapshot.saved_at);
        chrono::Duration::from_std(self.max_age).map_or(true, |max_age| age <= max_age)
    }
}

#[async_trait]
impl Hydrator for DatabaseHydrator {
    #[instrument(level = "debug", skip(self))]
    async fn orders_for_type(&self, type_id: i64, region_id: i64) -> Result<Vec<MarketOrder>> {
        match self.store.load(type_id, region_id).await {
            Ok(Some(snapshot)) if self.is_usable(&snapshot) => {
                debug!("Serving {} orders from the order store", snapshot.orders.len());
                return Ok(snapshot.orders);
            }
            Ok(Some(snapshot)) => {
                debug!("Stored orders from {} are too old", snapshot.saved_at);
            }
            Ok(None) => (),
            Err(err) => {
                warn!("Order store lookup failed, falling back: {err}");
            }
        }

        let orders = self.inner.orders_for_type(type_id, region_id).await?;

        if let Err(err) = self.store.save(type_id, region_id, &orders).await {
            warn!("Failed to persist {} orders: {err}", orders.len());
        }

        Ok(orders)
    }

    #[instrument(level = "debug", skip(self))]
    async fn orders_for_region(&self, region_id: i64) -> Result<Vec<MarketOrder>> {
        self.inner.orders_for_region(region_id).await
    }
}
