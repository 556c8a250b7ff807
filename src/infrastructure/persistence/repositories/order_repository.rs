use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::domain::models::{Order, OrderDetails, OrderState, TreasuryInfo};
use crate::infrastructure::persistence::entities::orders;
use crate::infrastructure::persistence::error::DbError;

/// Filters the task generator applies to orders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderCriteria {
    pub max_file_size: i64,
    pub min_reward: i64,
    pub min_price: f64,
}

/// Repository for storage orders
#[derive(Debug, Clone)]
pub struct OrderRepository {
    conn: DatabaseConnection,
}

impl OrderRepository {
    /// Create a new OrderRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Order>, DbError> {
        let result = orders::Entity::find_by_id(id).one(&self.conn).await?;
        result.map(Self::to_domain_model).transpose()
    }

    pub async fn find_by_address(&self, address: &str) -> Result<Option<Order>, DbError> {
        let result = orders::Entity::find()
            .filter(orders::Column::Address.eq(address))
            .one(&self.conn)
            .await?;
        result.map(Self::to_domain_model).transpose()
    }

    /// Insert an order inside a caller's transaction, returning its id
    pub async fn insert_with<C: ConnectionTrait>(
        db: &C,
        address: &str,
        details: &OrderDetails,
    ) -> Result<i64, DbError> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();
        let mut model = orders::ActiveModel {
            address: Set(address.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Self::apply_details(&mut model, details)?;

        let inserted = model.insert(db).await?;
        Ok(inserted.id)
    }

    /// Overwrite the chain-sourced fields of an order
    pub async fn update_details(&self, id: i64, details: &OrderDetails) -> Result<(), DbError> {
        let mut model = orders::ActiveModel {
            id: Set(id),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        Self::apply_details(&mut model, details)?;
        model.update(&self.conn).await?;
        Ok(())
    }

    /// Mark an order whose contract is gone
    pub async fn mark_invalid(&self, id: i64) -> Result<(), DbError> {
        orders::Entity::update_many()
            .col_expr(orders::Column::OrderState, Expr::value(OrderState::Invalid.code()))
            .col_expr(
                orders::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(chrono::Utc::now())),
            )
            .filter(orders::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Orders after `after_id` whose chain state may still change:
    /// not started, or started with the period still running
    pub async fn find_refreshable(
        &self,
        after_id: i64,
        now: i64,
        limit: u64,
    ) -> Result<Vec<Order>, DbError> {
        let results = orders::Entity::find()
            .filter(orders::Column::Id.gt(after_id))
            .filter(
                Condition::any()
                    .add(orders::Column::OrderState.eq(OrderState::NotStarted.code()))
                    .add(
                        Condition::all()
                            .add(orders::Column::OrderState.eq(OrderState::Started.code()))
                            .add(orders::Column::PeriodFinish.gte(now)),
                    ),
            )
            .order_by_asc(orders::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        results.into_iter().map(Self::to_domain_model).collect()
    }

    /// Orders after `after_id` worth serving
    pub async fn find_task_candidates(
        &self,
        after_id: i64,
        criteria: &OrderCriteria,
        limit: u64,
    ) -> Result<Vec<Order>, DbError> {
        let results = orders::Entity::find()
            .filter(orders::Column::Id.gt(after_id))
            .filter(orders::Column::OrderState.gte(OrderState::NotStarted.code()))
            .filter(orders::Column::FileSizeInBytes.lte(criteria.max_file_size))
            .filter(orders::Column::TotalRewards.gte(criteria.min_reward))
            .filter(orders::Column::Price.gte(criteria.min_price))
            .order_by_asc(orders::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        results.into_iter().map(Self::to_domain_model).collect()
    }

    fn apply_details(
        model: &mut orders::ActiveModel,
        details: &OrderDetails,
    ) -> Result<(), DbError> {
        let treasury_info = serde_json::to_string(&details.treasury_info)
            .map_err(|e| DbError::InvalidData(format!("treasury info: {}", e)))?;

        model.torrent_hash = Set(details.torrent_hash.clone());
        model.owner_address = Set(details.owner_address.clone());
        model.file_merkle_hash = Set(details.file_merkle_hash.clone());
        model.file_size_in_bytes = Set(details.file_size_in_bytes);
        model.storage_period_in_sec = Set(details.storage_period_in_sec);
        model.max_storage_proof_span_in_sec = Set(details.max_storage_proof_span_in_sec);
        model.max_storage_providers = Set(details.max_storage_providers);
        model.treasury_info = Set(treasury_info);
        model.started = Set(details.started);
        model.total_rewards = Set(details.total_rewards);
        model.period_finish = Set(details.period_finish);
        model.price = Set(details.price);
        model.order_state = Set(details.state.code());
        Ok(())
    }

    fn to_domain_model(model: orders::Model) -> Result<Order, DbError> {
        let state = OrderState::from_code(model.order_state).ok_or_else(|| {
            DbError::InvalidData(format!(
                "order {} has unknown state {}",
                model.id, model.order_state
            ))
        })?;
        let treasury_info: TreasuryInfo = serde_json::from_str(&model.treasury_info)
            .unwrap_or(TreasuryInfo {
                address: None,
                fee_rate: 0,
            });

        Ok(Order {
            id: model.id,
            address: model.address,
            torrent_hash: model.torrent_hash,
            owner_address: model.owner_address,
            file_merkle_hash: model.file_merkle_hash,
            file_size_in_bytes: model.file_size_in_bytes,
            storage_period_in_sec: model.storage_period_in_sec,
            max_storage_proof_span_in_sec: model.max_storage_proof_span_in_sec,
            max_storage_providers: model.max_storage_providers,
            treasury_info,
            started: model.started,
            total_rewards: model.total_rewards,
            period_finish: model.period_finish,
            price: model.price,
            state,
        })
    }
}
