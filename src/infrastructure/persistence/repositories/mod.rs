pub mod config_repository;
pub mod order_repository;
pub mod task_repository;
pub mod transaction_repository;

pub use config_repository::{ConfigRepository, LAST_ORDER_UPDATE_ID, LAST_TASK_GENERATE_ORDER_ID};
pub use order_repository::{OrderCriteria, OrderRepository};
pub use task_repository::TaskRepository;
pub use transaction_repository::TransactionRepository;

/// Collection of all repositories
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Repository for the config cursors
    pub config: ConfigRepository,
    /// Repository for storage orders
    pub order: OrderRepository,
    /// Repository for provider tasks
    pub task: TaskRepository,
    /// Repository for indexed transactions
    pub transaction: TransactionRepository,
}

impl Repositories {
    /// Create a new Repositories instance
    pub fn new(
        config: ConfigRepository,
        order: OrderRepository,
        task: TaskRepository,
        transaction: TransactionRepository,
    ) -> Self {
        Self {
            config,
            order,
            task,
            transaction,
        }
    }
}
