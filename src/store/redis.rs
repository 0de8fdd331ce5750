use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;
use tracing::info;

use crate::error::OrderCacheError;
use crate::error::Result;
use crate::traits::BackingStore;

/// Redis-backed store. Values are kept as raw bytes under `SET ... EX`.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to redis at {url}");
        let client = Client::open(url).map_err(OrderCacheError::store)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(OrderCacheError::store)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl BackingStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(OrderCacheError::store)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // Redis rejects zero expiration.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(OrderCacheError::store)
    }
}
