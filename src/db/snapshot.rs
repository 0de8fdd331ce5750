//! Latest known orders of a type in a region, one row per pair.
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub type_id:   i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub region_id: i64,
    pub saved_at:  DateTimeUtc,
    /// Postcard-encoded `Vec<MarketOrder>`.
    pub payload:   Vec<u8>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
