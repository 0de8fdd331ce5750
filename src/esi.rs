//! [`MarketApi`] over the EVE Swagger Interface.
//!
//! Endpoints in use:
//! - `/universe/types/` and `/universe/regions/` for the catalog
//! - `/markets/{region_id}/orders/` for orders
//!
//! Paginated endpoints report the number of pages in the `X-Pages` header; all pages are fetched.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::instrument;

use crate::error::OrderCacheError;
use crate::error::Result;
use crate::traits::MarketApi;
use crate::types::ApiOrder;

pub const DEFAULT_BASE_URL: &str = "https://esi.evetech.net/latest";
const USER_AGENT: &str = concat!("ecorder/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct EsiClient {
    client:   Client,
    base_url: String,
}

impl EsiClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(OrderCacheError::source)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        page: u32,
    ) -> Result<(Vec<T>, u32)> {
        let url = format!("{}{}", self.base_url, path);
        debug!("ESI request: {url} page {page}");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(OrderCacheError::source)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 420 {
            return Err(OrderCacheError::source(format!("ESI error limit reached on {path}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrderCacheError::source(format!("ESI {path}: HTTP {status} - {body}")));
        }

        let pages = response
            .headers()
            .get("x-pages")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let items = response.json::<Vec<T>>().await.map_err(OrderCacheError::source)?;
        Ok((items, pages))
    }

    async fn fetch_all<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<T>> {
        let (mut items, pages) = self.fetch_page(path, params, 1).await?;
        for page in 2..=pages {
            let (more, _) = self.fetch_page(path, params, page).await?;
            items.extend(more);
        }
        Ok(items)
    }
}

#[async_trait]
impl MarketApi for EsiClient {
    #[instrument(level = "debug", skip(self))]
    async fn type_ids(&self) -> Result<Vec<i64>> {
        self.fetch_all("/universe/types/", &[]).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn region_ids(&self) -> Result<Vec<i64>> {
        self.fetch_all("/universe/regions/", &[]).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn region_orders(&self, region_id: i64, type_id: i64) -> Result<Vec<ApiOrder>> {
        self.fetch_all(
            &format!("/markets/{region_id}/orders/"),
            &[("order_type", "all".to_string()), ("type_id", type_id.to_string())],
        )
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn region_all_orders(&self, region_id: i64) -> Result<Vec<ApiOrder>> {
        self.fetch_all(
            &format!("/markets/{region_id}/orders/"),
            &[("order_type", "all".to_string())],
        )
        .await
    }
}
