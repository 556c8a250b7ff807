//! SeaORM Entity for orders table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub address: String,
    pub torrent_hash: String,
    pub owner_address: String,
    pub file_merkle_hash: String,
    pub file_size_in_bytes: i64,
    pub storage_period_in_sec: i64,
    pub max_storage_proof_span_in_sec: i64,
    pub max_storage_providers: i32,
    #[sea_orm(column_type = "Text")]
    pub treasury_info: String,
    pub started: bool,
    pub total_rewards: i64,
    pub period_finish: i64,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    pub order_state: i32,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
