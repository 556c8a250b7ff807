use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::domain::models::{NewTask, Task, TaskState, TaskUpdate};
use crate::infrastructure::persistence::entities::tasks;
use crate::infrastructure::persistence::error::DbError;

/// Repository for provider tasks
#[derive(Debug, Clone)]
pub struct TaskRepository {
    conn: DatabaseConnection,
}

impl TaskRepository {
    /// Create a new TaskRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Task>, DbError> {
        let result = tasks::Entity::find_by_id(id).one(&self.conn).await?;
        result.map(Self::to_domain_model).transpose()
    }

    pub async fn find_by_order(&self, order_id: i64) -> Result<Option<Task>, DbError> {
        let result = tasks::Entity::find()
            .filter(tasks::Column::OrderId.eq(order_id))
            .one(&self.conn)
            .await?;
        result.map(Self::to_domain_model).transpose()
    }

    /// Whether an order already has its task, inside a caller's transaction
    pub async fn exists_for_order_with<C: ConnectionTrait>(
        db: &C,
        order_id: i64,
    ) -> Result<bool, DbError> {
        let count = tasks::Entity::find()
            .filter(tasks::Column::OrderId.eq(order_id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    /// Insert a task inside a caller's transaction, returning its id
    pub async fn insert_with<C: ConnectionTrait>(db: &C, task: &NewTask) -> Result<i64, DbError> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();
        let model = tasks::ActiveModel {
            order_id: Set(task.order_id),
            provider_address: Set(task.provider_address.clone()),
            task_state: Set(task.state.code()),
            last_proof_time: Set(task.last_proof_time),
            next_proof_time: Set(task.next_proof_time),
            header_retries: Set(0),
            child_retries: Set(0),
            claimed_rewards: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let inserted = model.insert(db).await?;
        Ok(inserted.id)
    }

    /// Tasks in a state, oldest first
    pub async fn find_by_state(&self, state: TaskState, limit: u64) -> Result<Vec<Task>, DbError> {
        let results = tasks::Entity::find()
            .filter(tasks::Column::TaskState.eq(state.code()))
            .order_by_asc(tasks::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        results.into_iter().map(Self::to_domain_model).collect()
    }

    /// Registered tasks whose next proof is due by `deadline`, most urgent first
    pub async fn find_due_proofs(&self, deadline: i64, limit: u64) -> Result<Vec<Task>, DbError> {
        let results = tasks::Entity::find()
            .filter(tasks::Column::TaskState.eq(TaskState::AwaitingProofSubmission.code()))
            .filter(tasks::Column::NextProofTime.lte(deadline))
            .order_by_asc(tasks::Column::NextProofTime)
            .order_by_asc(tasks::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        results.into_iter().map(Self::to_domain_model).collect()
    }

    /// Apply `update` to a task that is still in the state it was read in.
    /// Returns `false` when the row moved on in the meantime.
    pub async fn update(&self, task: &Task, update: &TaskUpdate) -> Result<bool, DbError> {
        if update.is_empty() {
            return Ok(true);
        }

        let mut query = tasks::Entity::update_many().col_expr(
            tasks::Column::UpdatedAt,
            Expr::value(DateTimeWithTimeZone::from(chrono::Utc::now())),
        );
        if let Some(state) = update.state() {
            query = query.col_expr(tasks::Column::TaskState, Expr::value(state.code()));
        }
        if let Some(address) = &update.provider_address {
            query = query.col_expr(tasks::Column::ProviderAddress, Expr::value(address.clone()));
        }
        if let Some(time) = update.last_proof_time {
            query = query.col_expr(tasks::Column::LastProofTime, Expr::value(time));
        }
        if let Some(time) = update.next_proof_time {
            query = query.col_expr(tasks::Column::NextProofTime, Expr::value(time));
        }
        if let Some(retries) = update.header_retries {
            query = query.col_expr(tasks::Column::HeaderRetries, Expr::value(retries));
        }
        if let Some(retries) = update.child_retries {
            query = query.col_expr(tasks::Column::ChildRetries, Expr::value(retries));
        }
        if let Some(amount) = update.claimed_rewards {
            query = query.col_expr(tasks::Column::ClaimedRewards, Expr::value(amount));
        }

        let result = query
            .filter(tasks::Column::Id.eq(task.id))
            .filter(tasks::Column::TaskState.eq(task.state.code()))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    fn to_domain_model(model: tasks::Model) -> Result<Task, DbError> {
        let state = TaskState::from_code(model.task_state).ok_or_else(|| {
            DbError::InvalidData(format!(
                "task {} has unknown state {}",
                model.id, model.task_state
            ))
        })?;

        Ok(Task {
            id: model.id,
            order_id: model.order_id,
            provider_address: model.provider_address,
            state,
            last_proof_time: model.last_proof_time,
            next_proof_time: model.next_proof_time,
            header_retries: model.header_retries,
            child_retries: model.child_retries,
            claimed_rewards: model.claimed_rewards,
        })
    }
}
