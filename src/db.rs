//! SeaORM-backed [`OrderStore`].
pub mod snapshot;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use sea_orm::EntityTrait;
use sea_orm::Schema;
use sea_orm::Set;
use tracing::info;
use tracing::instrument;

use crate::error::OrderCacheError;
use crate::error::Result;
use crate::traits::OrderSnapshot;
use crate::traits::OrderStore;
use crate::types::MarketOrder;

#[derive(Clone, Debug)]
pub struct SeaOrmOrderStore {
    db: DatabaseConnection,
}

impl SeaOrmOrderStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to order database");
        let db = sea_orm::Database::connect(url).await?;
        Ok(Self::new(db))
    }

    /// Create the snapshot table unless it already exists.
    pub async fn create_schema(&self) -> Result<()> {
        let backend = self.db.get_database_backend();
        let mut table = Schema::new(backend).create_table_from_entity(snapshot::Entity);
        table.if_not_exists();
        self.db.execute(backend.build(&table)).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for SeaOrmOrderStore {
    #[instrument(level = "trace", skip(self))]
    async fn load(&self, type_id: i64, region_id: i64) -> Result<Option<OrderSnapshot>> {
        let Some(row) = snapshot::Entity::find_by_id((type_id, region_id)).one(&self.db).await?
        else {
            return Ok(None);
        };

        let orders: Vec<MarketOrder> = postcard::from_bytes(&row.payload).map_err(OrderCacheError::Decode)?;
        Ok(Some(OrderSnapshot {
            orders,
            saved_at: row.saved_at,
        }))
    }

    #[instrument(level = "trace", skip(self, orders))]
    async fn save(&self, type_id: i64, region_id: i64, orders: &[MarketOrder]) -> Result<()> {
        let payload = postcard::to_stdvec(orders).map_err(OrderCacheError::Encode)?;
        let row = snapshot::ActiveModel {
            type_id:   Set(type_id),
            region_id: Set(region_id),
            saved_at:  Set(Utc::now()),
            payload:   Set(payload),
        };

        snapshot::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([snapshot::Column::TypeId, snapshot::Column::RegionId])
                    .update_columns([snapshot::Column::SavedAt, snapshot::Column::Payload])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }
}
