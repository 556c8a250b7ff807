use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::domain::models::{NewTransaction, TransactionDetail, TransactionRecord};
use crate::infrastructure::persistence::entities::transactions;
use crate::infrastructure::persistence::error::{is_unique_violation, DbError};

/// Repository for indexed contract transactions
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    conn: DatabaseConnection,
}

impl TransactionRepository {
    /// Create a new TransactionRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a transaction unless (address, tx_hash, lt) is already stored.
    /// Returns `false` when the row existed.
    pub async fn insert_if_absent(&self, tx: &NewTransaction) -> Result<bool, DbError> {
        let detail = serde_json::to_string(&tx.detail)
            .map_err(|e| DbError::InvalidData(format!("transaction detail: {}", e)))?;

        let model = transactions::ActiveModel {
            address: Set(tx.address.clone()),
            tx_hash: Set(tx.tx_hash.clone()),
            lt: Set(tx.lt),
            op_code: Set(tx.op_code.clone()),
            exit_code: Set(tx.exit_code),
            detail: Set(detail),
            is_order_placement: Set(tx.is_order_placement),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        match model.insert(&self.conn).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Transactions after `after_id` still flagged as order placements, oldest first
    pub async fn find_order_placements(
        &self,
        after_id: i64,
        limit: u64,
    ) -> Result<Vec<TransactionRecord>, DbError> {
        let results = transactions::Entity::find()
            .filter(transactions::Column::IsOrderPlacement.eq(true))
            .filter(transactions::Column::Id.gt(after_id))
            .order_by_asc(transactions::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        results.into_iter().map(Self::to_domain_model).collect()
    }

    /// Clear the order placement flag
    pub async fn clear_order_placement(&self, id: i64) -> Result<(), DbError> {
        Self::clear_order_placement_with(&self.conn, id).await
    }

    /// Clear the order placement flag inside a caller's transaction
    pub async fn clear_order_placement_with<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<(), DbError> {
        transactions::Entity::update_many()
            .col_expr(transactions::Column::IsOrderPlacement, Expr::value(false))
            .filter(transactions::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Look up a transaction by its identity
    pub async fn find(
        &self,
        address: &str,
        tx_hash: &str,
        lt: i64,
    ) -> Result<Option<TransactionRecord>, DbError> {
        let result = transactions::Entity::find()
            .filter(transactions::Column::Address.eq(address))
            .filter(transactions::Column::TxHash.eq(tx_hash))
            .filter(transactions::Column::Lt.eq(lt))
            .one(&self.conn)
            .await?;

        result.map(Self::to_domain_model).transpose()
    }

    /// Number of indexed transactions of a contract
    pub async fn count_for_address(&self, address: &str) -> Result<u64, DbError> {
        let count = transactions::Entity::find()
            .filter(transactions::Column::Address.eq(address))
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    fn to_domain_model(model: transactions::Model) -> Result<TransactionRecord, DbError> {
        let detail: TransactionDetail = serde_json::from_str(&model.detail).map_err(|e| {
            DbError::InvalidData(format!("transaction {} detail: {}", model.id, e))
        })?;

        Ok(TransactionRecord {
            id: model.id,
            address: model.address,
            tx_hash: model.tx_hash,
            lt: model.lt,
            op_code: model.op_code,
            exit_code: model.exit_code,
            detail,
            is_order_placement: model.is_order_placement,
        })
    }
}
