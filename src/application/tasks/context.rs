//! Shared handles of the task stages

use std::sync::Arc;
use tokio::time::{sleep, Duration};

use crate::config::{StorageDaemonConfig, TaskConfig};
use crate::domain::errors::AgentError;
use crate::domain::models::{Order, Task, TaskUpdate};
use crate::infrastructure::persistence::repositories::Repositories;
use crate::infrastructure::proof::ProofGenerator;
use crate::infrastructure::storage_daemon::StorageDaemon;
use crate::infrastructure::ton::StorageContract;
use crate::utils::{logging, Clock};

/// Everything a task stage needs, cheap to clone
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub repositories: Repositories,
    pub contract: Arc<dyn StorageContract>,
    pub daemon: Arc<dyn StorageDaemon>,
    pub proofs: Arc<dyn ProofGenerator>,
    pub clock: Arc<dyn Clock>,
    pub task_config: TaskConfig,
    pub download_path: String,
}

impl TaskContext {
    pub fn new(
        repositories: Repositories,
        contract: Arc<dyn StorageContract>,
        daemon: Arc<dyn StorageDaemon>,
        proofs: Arc<dyn ProofGenerator>,
        clock: Arc<dyn Clock>,
        task_config: TaskConfig,
        storage_config: &StorageDaemonConfig,
    ) -> Self {
        Self {
            repositories,
            contract,
            daemon,
            proofs,
            clock,
            task_config,
            download_path: storage_config.download_path.clone(),
        }
    }

    /// The order a task serves
    pub async fn order_for(&self, task: &Task) -> Result<Order, AgentError> {
        self.repositories
            .order
            .find_by_id(task.order_id)
            .await?
            .ok_or_else(|| {
                AgentError::NotFound(format!("order {} of task {}", task.order_id, task.id))
            })
    }

    /// Write an update guarded by the task's current state
    pub async fn apply(
        &self,
        stage: &str,
        task: &Task,
        update: TaskUpdate,
    ) -> Result<(), AgentError> {
        let applied = self.repositories.task.update(task, &update).await?;
        match (applied, update.state()) {
            (true, Some(state)) => logging::log_info(&format!(
                "[STAGE:{}] Task {} (order {}) {} -> {}",
                stage, task.id, task.order_id, task.state, state
            )),
            (true, None) => {}
            (false, _) => logging::log_warning(&format!(
                "[STAGE:{}] Task {} left {} before the update was written",
                stage, task.id, task.state
            )),
        }
        Ok(())
    }

    /// Whether the provider wallet can pay for outgoing messages
    pub async fn has_sufficient_balance(&self, stage: &str) -> bool {
        match self.contract.provider_balance().await {
            Ok(Some(balance)) if balance >= self.task_config.provider_min_balance => true,
            Ok(Some(balance)) => {
                logging::log_warning(&format!(
                    "[STAGE:{}] Provider balance {} is below {}, waiting for funds",
                    stage, balance, self.task_config.provider_min_balance
                ));
                false
            }
            Ok(None) => {
                logging::log_warning(&format!(
                    "[STAGE:{}] Provider wallet is not active, waiting for funds",
                    stage
                ));
                false
            }
            Err(e) => {
                logging::log_error(&format!(
                    "[STAGE:{}] Failed to read provider balance: {}",
                    stage, e
                ));
                false
            }
        }
    }
}

pub(crate) async fn pause_ms(ms: u64) {
    if ms > 0 {
        sleep(Duration::from_millis(ms)).await;
    }
}
