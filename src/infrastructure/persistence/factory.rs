use sea_orm::DatabaseConnection;

use crate::infrastructure::persistence::connection::DbPool;
use crate::infrastructure::persistence::repositories::{
    ConfigRepository, OrderRepository, Repositories, TaskRepository, TransactionRepository,
};

/// Factory for creating repositories
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create all repositories over one pool
    pub fn create_repositories(db_pool: &DbPool) -> Repositories {
        let conn = db_pool.get_connection().clone();

        Repositories::new(
            Self::create_config_repository(conn.clone()),
            Self::create_order_repository(conn.clone()),
            Self::create_task_repository(conn.clone()),
            Self::create_transaction_repository(conn),
        )
    }

    /// Create a config repository
    pub fn create_config_repository(conn: DatabaseConnection) -> ConfigRepository {
        ConfigRepository::new(conn)
    }

    /// Create an order repository
    pub fn create_order_repository(conn: DatabaseConnection) -> OrderRepository {
        OrderRepository::new(conn)
    }

    /// Create a task repository
    pub fn create_task_repository(conn: DatabaseConnection) -> TaskRepository {
        TaskRepository::new(conn)
    }

    /// Create a transaction repository
    pub fn create_transaction_repository(conn: DatabaseConnection) -> TransactionRepository {
        TransactionRepository::new(conn)
    }
}
