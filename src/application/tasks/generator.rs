//! Creates one task per order worth serving

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::time::sleep;

use crate::application::unit::PollingUnit;
use crate::config::{PollConfig, TaskConfig};
use crate::domain::errors::AgentError;
use crate::domain::models::{NewTask, Order};
use crate::infrastructure::persistence::repositories::{
    ConfigRepository, OrderCriteria, Repositories, TaskRepository, LAST_TASK_GENERATE_ORDER_ID,
};
use crate::infrastructure::ton::StorageContract;
use crate::utils::logging;

const BATCH_SIZE: u64 = 10;

/// Walks candidate orders by id and decides whether to serve each
#[derive(Debug)]
pub struct TaskGenerator {
    conn: DatabaseConnection,
    repositories: Repositories,
    contract: Arc<dyn StorageContract>,
    criteria: OrderCriteria,
    poll: PollConfig,
    /// Scan position; runs ahead of the persisted cursor past failed orders
    scan: AtomicI64,
}

impl TaskGenerator {
    pub fn new(
        conn: DatabaseConnection,
        repositories: Repositories,
        contract: Arc<dyn StorageContract>,
        task_config: &TaskConfig,
        poll: PollConfig,
    ) -> Self {
        Self {
            conn,
            repositories,
            contract,
            criteria: OrderCriteria {
                max_file_size: task_config.max_file_size,
                min_reward: task_config.min_reward,
                min_price: task_config.min_price,
            },
            poll,
            scan: AtomicI64::new(0),
        }
    }

    /// Examine one batch of candidate orders; returns the number examined.
    ///
    /// The scan moves past every order, failed or not, and restarts from the
    /// persisted cursor after an empty batch. The persisted cursor only
    /// advances over an unbroken run of decided orders, so a failed order is
    /// retried on the next sweep without holding back the ones after it.
    pub async fn process_batch(&self) -> Result<usize, AgentError> {
        let persisted = self
            .repositories
            .config
            .get_i64(LAST_TASK_GENERATE_ORDER_ID, 0)
            .await?;
        let after_id = self.scan.load(Ordering::SeqCst).max(persisted);
        let orders = self
            .repositories
            .order
            .find_task_candidates(after_id, &self.criteria, BATCH_SIZE)
            .await?;

        if orders.is_empty() {
            self.scan.store(0, Ordering::SeqCst);
            return Ok(0);
        }

        let mut contiguous = after_id == persisted;
        for order in &orders {
            let decision = if self.repositories.task.find_by_order(order.id).await?.is_some() {
                None
            } else {
                match self.decide(order).await {
                    Ok(decision) => decision,
                    Err(e) => {
                        logging::log_error(&format!(
                            "[GENERATOR] Failed to evaluate order {} ({}): {}",
                            order.id, order.address, e
                        ));
                        contiguous = false;
                        self.scan.store(order.id, Ordering::SeqCst);
                        continue;
                    }
                }
            };

            let txn = self.conn.begin().await?;
            if let Some(task) = &decision {
                if !TaskRepository::exists_for_order_with(&txn, order.id).await? {
                    let task_id = TaskRepository::insert_with(&txn, task).await?;
                    logging::log_info(&format!(
                        "[GENERATOR] Task {} created for order {} in {}",
                        task_id, order.id, task.state
                    ));
                }
            }
            if contiguous {
                ConfigRepository::set_with(&txn, LAST_TASK_GENERATE_ORDER_ID, &order.id.to_string())
                    .await?;
            }
            txn.commit().await?;
            self.scan.store(order.id, Ordering::SeqCst);
        }

        Ok(orders.len())
    }

    /// Task to create for an order without one, if any
    pub async fn decide(&self, order: &Order) -> Result<Option<NewTask>, AgentError> {
        let Some(state) = self.contract.order_state(&order.address).await? else {
            logging::log_info(&format!(
                "[GENERATOR] Order {} contract is not active, skipping",
                order.id
            ));
            return Ok(None);
        };

        let provider = self.contract.provider_address();
        if let Some(entry) = state.registry.entry(&provider)? {
            let last_proof_time = entry.last_proof_time.unwrap_or(entry.registered_at);
            return Ok(Some(NewTask::registered(
                order.id,
                provider.to_string(),
                i64::from(last_proof_time),
                order.max_storage_proof_span_in_sec,
            )));
        }

        if state.residual_slots() <= 0 {
            logging::log_info(&format!(
                "[GENERATOR] Order {} has no free provider slots",
                order.id
            ));
            return Ok(None);
        }

        Ok(Some(NewTask::unregistered(order.id)))
    }
}

#[async_trait]
impl PollingUnit for TaskGenerator {
    fn name(&self) -> String {
        "generator".to_string()
    }

    async fn run(&self) -> Result<(), AgentError> {
        loop {
            if self.process_batch().await? == 0 {
                sleep(self.poll.idle()).await;
            } else {
                sleep(self.poll.batch_interval()).await;
            }
        }
    }
}
