//! Claims rewards once the storage period is over

use async_trait::async_trait;

use super::context::{pause_ms, TaskContext};
use super::poller::TaskStage;
use crate::domain::errors::AgentError;
use crate::domain::models::{Task, TaskState, TaskUpdate};
use crate::infrastructure::ton::ChainError;
use crate::utils::logging;

#[derive(Debug, Clone)]
pub struct RewardClaimStage {
    ctx: TaskContext,
}

impl RewardClaimStage {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskStage for RewardClaimStage {
    fn name(&self) -> &'static str {
        "claim"
    }

    fn batch_size(&self) -> u64 {
        100
    }

    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError> {
        Ok(self
            .ctx
            .repositories
            .task
            .find_by_state(TaskState::PeriodFinished, limit)
            .await?)
    }

    async fn handle(&self, task: &Task) -> Result<(), AgentError> {
        let order = self.ctx.order_for(task).await?;
        let earned = self.ctx.contract.earned(&order.address).await?;
        let claimed = i64::try_from(earned).map_err(|_| {
            ChainError::Parse(format!("earned {} does not fit a reward amount", earned))
        })?;

        if earned == 0 {
            let update =
                TaskUpdate::transition(task.state, TaskState::TaskFinished)?.claimed_rewards(0);
            return self.ctx.apply(self.name(), task, update).await;
        }

        self.ctx.contract.claim_rewards(&order.address).await?;
        logging::log_info(&format!(
            "[STAGE:{}] Claim of {} nanotons sent for order {}",
            self.name(),
            earned,
            order.id
        ));

        for _ in 0..self.ctx.task_config.claim_retries {
            pause_ms(self.ctx.task_config.claim_interval_ms).await;
            if self.ctx.contract.earned(&order.address).await? == 0 {
                let update = TaskUpdate::transition(task.state, TaskState::TaskFinished)?
                    .claimed_rewards(claimed);
                return self.ctx.apply(self.name(), task, update).await;
            }
        }

        logging::log_warning(&format!(
            "[STAGE:{}] Claim for order {} not settled yet",
            self.name(),
            order.id
        ));
        Ok(())
    }
}
