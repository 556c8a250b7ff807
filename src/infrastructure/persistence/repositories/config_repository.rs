use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::infrastructure::persistence::entities::configs;
use crate::infrastructure::persistence::error::DbError;

/// Cursor of the order refresher
pub const LAST_ORDER_UPDATE_ID: &str = "last_order_update_id";
/// Cursor of the task generator
pub const LAST_TASK_GENERATE_ORDER_ID: &str = "last_task_generate_order_id";

/// Repository for the key/value config table
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    conn: DatabaseConnection,
}

impl ConfigRepository {
    /// Create a new ConfigRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        let result = configs::Entity::find()
            .filter(configs::Column::ConfigKey.eq(key))
            .one(&self.conn)
            .await?;
        Ok(result.map(|model| model.config_value))
    }

    /// Read an integer value; missing or unparsable values yield `default`
    pub async fn get_i64(&self, key: &str, default: i64) -> Result<i64, DbError> {
        Ok(self
            .get(key)
            .await?
            .and_then(|value| value.parse().ok())
            .unwrap_or(default))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        Self::set_with(&self.conn, key, value).await
    }

    /// Upsert a value inside a caller's transaction
    pub async fn set_with<C: ConnectionTrait>(
        db: &C,
        key: &str,
        value: &str,
    ) -> Result<(), DbError> {
        let model = configs::ActiveModel {
            config_key: Set(key.to_string()),
            config_value: Set(value.to_string()),
            ..Default::default()
        };

        configs::Entity::insert(model)
            .on_conflict(
                OnConflict::column(configs::Column::ConfigKey)
                    .update_column(configs::Column::ConfigValue)
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }
}
