//! Generic select-handle-sleep loop shared by all task stages

use async_trait::async_trait;
use std::fmt::Debug;
use tokio::time::sleep;

use crate::application::unit::PollingUnit;
use crate::config::PollConfig;
use crate::domain::errors::AgentError;
use crate::domain::models::Task;
use crate::utils::logging;

/// One state handler of the task lifecycle
#[async_trait]
pub trait TaskStage: Send + Sync + Debug {
    /// Short name used in log tags
    fn name(&self) -> &'static str;

    fn batch_size(&self) -> u64 {
        10
    }

    /// Checked before each batch; `false` backs the whole loop off
    async fn ready(&self) -> bool {
        true
    }

    /// Tasks this stage should handle next
    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError>;

    /// Handle one task; errors are logged and do not stop the batch
    async fn handle(&self, task: &Task) -> Result<(), AgentError>;
}

/// Outcome of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The stage was not ready to run
    NotReady,
    /// Number of tasks selected and handled
    Handled(usize),
}

/// Drives a [`TaskStage`] forever
#[derive(Debug)]
pub struct StagePoller<S: TaskStage> {
    stage: S,
    poll: PollConfig,
}

impl<S: TaskStage> StagePoller<S> {
    pub fn new(stage: S, poll: PollConfig) -> Self {
        Self { stage, poll }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    /// Select one batch and handle every task in it
    pub async fn poll_once(&self) -> Result<PollOutcome, AgentError> {
        if !self.stage.ready().await {
            return Ok(PollOutcome::NotReady);
        }

        let tasks = self.stage.select(self.stage.batch_size()).await?;
        for task in &tasks {
            if let Err(e) = self.stage.handle(task).await {
                logging::log_error(&format!(
                    "[STAGE:{}] Task {} (order {}) failed: {}",
                    self.stage.name(),
                    task.id,
                    task.order_id,
                    e
                ));
            }
        }

        Ok(PollOutcome::Handled(tasks.len()))
    }
}

#[async_trait]
impl<S: TaskStage> PollingUnit for StagePoller<S> {
    fn name(&self) -> String {
        format!("stage:{}", self.stage.name())
    }

    async fn run(&self) -> Result<(), AgentError> {
        loop {
            match self.poll_once().await? {
                PollOutcome::Handled(count) if count > 0 => sleep(self.poll.batch_interval()).await,
                _ => sleep(self.poll.idle()).await,
            }
        }
    }
}
