//! Registers the provider on orders whose bag is fully downloaded

use async_trait::async_trait;

use super::context::{pause_ms, TaskContext};
use super::poller::TaskStage;
use crate::domain::cell::Address;
use crate::domain::contract::{StorageContractState, NO_NEXT_PROOF};
use crate::domain::errors::AgentError;
use crate::domain::models::{Order, Task, TaskState, TaskUpdate};
use crate::utils::logging;

#[derive(Debug, Clone)]
pub struct RegistrationStage {
    ctx: TaskContext,
}

impl RegistrationStage {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }

    /// Update moving the task to proof submission when the registry already
    /// lists this provider with a scheduled proof
    fn confirmed_update(
        &self,
        task: &Task,
        order: &Order,
        state: &StorageContractState,
        provider: &Address,
    ) -> Result<Option<TaskUpdate>, AgentError> {
        let Some(entry) = state.registry.entry(provider)? else {
            return Ok(None);
        };
        if entry.next_proof == NO_NEXT_PROOF {
            return Ok(None);
        }

        let last_proof_time = entry.last_proof_time.unwrap_or(entry.registered_at);
        Ok(Some(
            TaskUpdate::transition(task.state, TaskState::AwaitingProofSubmission)?
                .provider_address(provider.to_string())
                .proof_times(i64::from(last_proof_time), order.max_storage_proof_span_in_sec),
        ))
    }
}

#[async_trait]
impl TaskStage for RegistrationStage {
    fn name(&self) -> &'static str {
        "register"
    }

    async fn ready(&self) -> bool {
        self.ctx.has_sufficient_balance(self.name()).await
    }

    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError> {
        Ok(self
            .ctx
            .repositories
            .task
            .find_by_state(TaskState::DownloadFullSucceeded, limit)
            .await?)
    }

    async fn handle(&self, task: &Task) -> Result<(), AgentError> {
        let order = self.ctx.order_for(task).await?;
        let provider = self.ctx.contract.provider_address();

        let Some(state) = self.ctx.contract.order_state(&order.address).await? else {
            logging::log_warning(&format!(
                "[STAGE:{}] Order {} contract is not active",
                self.name(),
                order.id
            ));
            return Ok(());
        };

        if let Some(update) = self.confirmed_update(task, &order, &state, &provider)? {
            logging::log_info(&format!(
                "[STAGE:{}] Provider already registered on order {}",
                self.name(),
                order.id
            ));
            return self.ctx.apply(self.name(), task, update).await;
        }

        if state.residual_slots() <= 0 {
            return self
                .ctx
                .apply(
                    self.name(),
                    task,
                    TaskUpdate::transition(task.state, TaskState::ProviderSlotsExhausted)?,
                )
                .await;
        }

        self.ctx.contract.register(&order.address).await?;
        logging::log_info(&format!(
            "[STAGE:{}] Registration sent for order {}",
            self.name(),
            order.id
        ));

        for _ in 0..self.ctx.task_config.register_check_retries {
            pause_ms(self.ctx.task_config.register_check_interval_ms).await;
            let Some(state) = self.ctx.contract.order_state(&order.address).await? else {
                continue;
            };
            if let Some(update) = self.confirmed_update(task, &order, &state, &provider)? {
                return self.ctx.apply(self.name(), task, update).await;
            }
        }

        logging::log_warning(&format!(
            "[STAGE:{}] Registration on order {} not confirmed yet",
            self.name(),
            order.id
        ));
        Ok(())
    }
}
