//! SeaORM Entity for transactions table
//! Transactions of the tracked bag contract, written once by the indexer

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub address: String,
    pub tx_hash: String,
    pub lt: i64,
    pub op_code: String,
    pub exit_code: i32,
    #[sea_orm(column_type = "Text")]
    pub detail: String,
    pub is_order_placement: bool,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
