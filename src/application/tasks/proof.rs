//! Proof submission and acknowledgement stages

use async_trait::async_trait;

use super::context::{pause_ms, TaskContext};
use super::poller::TaskStage;
use crate::domain::contract::NO_NEXT_PROOF;
use crate::domain::errors::AgentError;
use crate::domain::models::{Task, TaskState, TaskUpdate};
use crate::utils::logging;

/// Submits a storage proof when one is due
#[derive(Debug, Clone)]
pub struct ProofSubmissionStage {
    ctx: TaskContext,
}

impl ProofSubmissionStage {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskStage for ProofSubmissionStage {
    fn name(&self) -> &'static str {
        "prove"
    }

    async fn ready(&self) -> bool {
        self.ctx.has_sufficient_balance(self.name()).await
    }

    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError> {
        let deadline = self.ctx.clock.now() + self.ctx.task_config.submit_proof_before_sec;
        Ok(self
            .ctx
            .repositories
            .task
            .find_due_proofs(deadline, limit)
            .await?)
    }

    async fn handle(&self, task: &Task) -> Result<(), AgentError> {
        let order = self.ctx.order_for(task).await?;
        let Some(state) = self.ctx.contract.order_state(&order.address).await? else {
            logging::log_warning(&format!(
                "[STAGE:{}] Order {} contract is not active",
                self.name(),
                order.id
            ));
            return Ok(());
        };
        if !state.rewards.started {
            logging::log_debug(&format!(
                "[STAGE:{}] Order {} has not started",
                self.name(),
                order.id
            ));
            return Ok(());
        }

        let provider = self.ctx.contract.provider_address();
        let next_proof = state.registry.next_proof(&provider)?;
        if next_proof == NO_NEXT_PROOF {
            logging::log_warning(&format!(
                "[STAGE:{}] No proof scheduled for order {}",
                self.name(),
                order.id
            ));
            return Ok(());
        }
        let piece = next_proof as u64;

        let period_finish = i64::from(state.rewards.period_finish);
        if self.ctx.clock.now() > period_finish {
            if task.last_proof_time < period_finish {
                let proofs = self.ctx.proofs.proofs(&order.torrent_hash, piece).await?;
                self.ctx.contract.submit_proof(&order.address, &proofs).await?;
                logging::log_info(&format!(
                    "[STAGE:{}] Final proof submitted for order {}",
                    self.name(),
                    order.id
                ));
            }
            return self
                .ctx
                .apply(
                    self.name(),
                    task,
                    TaskUpdate::transition(task.state, TaskState::PeriodFinished)?,
                )
                .await;
        }

        let proofs = self.ctx.proofs.proofs(&order.torrent_hash, piece).await?;
        let mut update = TaskUpdate::transition(task.state, TaskState::ProofSubmittedAwaitingAck)?;
        if let Some(last_proof_time) = state.registry.last_proof_time(&provider)? {
            update = update.proof_times(
                i64::from(last_proof_time),
                order.max_storage_proof_span_in_sec,
            );
        }

        self.ctx.contract.submit_proof(&order.address, &proofs).await?;
        logging::log_info(&format!(
            "[STAGE:{}] Proof for piece {} submitted for order {}",
            self.name(),
            piece,
            order.id
        ));
        self.ctx.apply(self.name(), task, update).await
    }
}

/// Waits for the contract to record a submitted proof
#[derive(Debug, Clone)]
pub struct ProofAckStage {
    ctx: TaskContext,
}

impl ProofAckStage {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskStage for ProofAckStage {
    fn name(&self) -> &'static str {
        "ack"
    }

    fn batch_size(&self) -> u64 {
        100
    }

    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError> {
        Ok(self
            .ctx
            .repositories
            .task
            .find_by_state(TaskState::ProofSubmittedAwaitingAck, limit)
            .await?)
    }

    async fn handle(&self, task: &Task) -> Result<(), AgentError> {
        let order = self.ctx.order_for(task).await?;
        let provider = self.ctx.contract.provider_address();

        for attempt in 0..self.ctx.task_config.ack_retries {
            if attempt > 0 {
                pause_ms(self.ctx.task_config.ack_interval_ms).await;
            }
            let Some(state) = self.ctx.contract.order_state(&order.address).await? else {
                continue;
            };
            if let Some(last_proof_time) = state.registry.last_proof_time(&provider)? {
                let last_proof_time = i64::from(last_proof_time);
                if last_proof_time > task.last_proof_time {
                    let update =
                        TaskUpdate::transition(task.state, TaskState::AwaitingProofSubmission)?
                            .proof_times(last_proof_time, order.max_storage_proof_span_in_sec);
                    return self.ctx.apply(self.name(), task, update).await;
                }
            }
        }

        logging::log_warning(&format!(
            "[STAGE:{}] Proof for order {} not confirmed, will prove again",
            self.name(),
            order.id
        ));
        self.ctx
            .apply(
                self.name(),
                task,
                TaskUpdate::transition(task.state, TaskState::AwaitingProofSubmission)?,
            )
            .await
    }
}
