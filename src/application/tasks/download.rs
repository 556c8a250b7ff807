//! Bag download stages: header request, header progress, child request, child progress

use async_trait::async_trait;

use super::context::TaskContext;
use super::poller::TaskStage;
use crate::domain::errors::AgentError;
use crate::domain::models::{Task, TaskState, TaskUpdate};
use crate::infrastructure::storage_daemon::{AddBagRequest, BagDetails};
use crate::utils::logging;

/// Asks the daemon for the bag header of an unregistered task
#[derive(Debug, Clone)]
pub struct HeaderRequestStage {
    ctx: TaskContext,
}

impl HeaderRequestStage {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskStage for HeaderRequestStage {
    fn name(&self) -> &'static str {
        "header_request"
    }

    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError> {
        Ok(self
            .ctx
            .repositories
            .task
            .find_by_state(TaskState::Unregistered, limit)
            .await?)
    }

    async fn handle(&self, task: &Task) -> Result<(), AgentError> {
        let order = self.ctx.order_for(task).await?;
        let request = AddBagRequest::header(&order.torrent_hash, &self.ctx.download_path);

        let update = match self.ctx.daemon.add_bag(&request).await {
            Ok(()) => TaskUpdate::transition(task.state, TaskState::DownloadHeaderStarted)?,
            Err(e) => {
                let retries = task.header_retries + 1;
                logging::log_warning(&format!(
                    "[STAGE:{}] Header request for bag {} failed ({} of {}): {}",
                    self.name(),
                    order.torrent_hash,
                    retries,
                    self.ctx.task_config.header_max_retries,
                    e
                ));
                if retries > self.ctx.task_config.header_max_retries {
                    TaskUpdate::transition(task.state, TaskState::DownloadHeaderFailed)?
                        .header_retries(retries)
                } else {
                    TaskUpdate::new().header_retries(retries)
                }
            }
        };

        self.ctx.apply(self.name(), task, update).await
    }
}

/// Waits for the requested header to arrive
#[derive(Debug, Clone)]
pub struct HeaderProgressStage {
    ctx: TaskContext,
}

impl HeaderProgressStage {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskStage for HeaderProgressStage {
    fn name(&self) -> &'static str {
        "header_progress"
    }

    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError> {
        Ok(self
            .ctx
            .repositories
            .task
            .find_by_state(TaskState::DownloadHeaderStarted, limit)
            .await?)
    }

    async fn handle(&self, task: &Task) -> Result<(), AgentError> {
        let order = self.ctx.order_for(task).await?;
        let Some(details) = self.ctx.daemon.bag_details(&order.torrent_hash).await? else {
            return Ok(());
        };

        let next = if details.is_fully_downloaded() {
            TaskState::DownloadFullSucceeded
        } else if details.header_loaded {
            TaskState::DownloadHeaderSucceeded
        } else {
            return Ok(());
        };

        self.ctx
            .apply(self.name(), task, TaskUpdate::transition(task.state, next)?)
            .await
    }
}

/// Requests every file listed in a loaded header
#[derive(Debug, Clone)]
pub struct ChildRequestStage {
    ctx: TaskContext,
}

impl ChildRequestStage {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl TaskStage for ChildRequestStage {
    fn name(&self) -> &'static str {
        "child_request"
    }

    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError> {
        Ok(self
            .ctx
            .repositories
            .task
            .find_by_state(TaskState::DownloadHeaderSucceeded, limit)
            .await?)
    }

    async fn handle(&self, task: &Task) -> Result<(), AgentError> {
        let order = self.ctx.order_for(task).await?;
        let Some(details) = self.ctx.daemon.bag_details(&order.torrent_hash).await? else {
            return Ok(());
        };

        let request = AddBagRequest::files(
            &order.torrent_hash,
            &self.ctx.download_path,
            details.file_indexes(),
        );
        let update = match self.ctx.daemon.add_bag(&request).await {
            Ok(()) => TaskUpdate::transition(task.state, TaskState::DownloadChildStarted)?,
            Err(e) => {
                let retries = task.child_retries + 1;
                logging::log_warning(&format!(
                    "[STAGE:{}] File request for bag {} failed ({} of {}): {}",
                    self.name(),
                    order.torrent_hash,
                    retries,
                    self.ctx.task_config.child_max_retries,
                    e
                ));
                if retries > self.ctx.task_config.child_max_retries {
                    TaskUpdate::transition(task.state, TaskState::DownloadChildFailed)?
                        .child_retries(retries)
                } else {
                    TaskUpdate::new().child_retries(retries)
                }
            }
        };

        self.ctx.apply(self.name(), task, update).await
    }
}

/// Waits until every file is complete on local disk
#[derive(Debug, Clone)]
pub struct ChildProgressStage {
    ctx: TaskContext,
}

impl ChildProgressStage {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }
}

/// Every listed file exists locally with its listed size
pub async fn files_present(details: &BagDetails) -> bool {
    for file in &details.files {
        match tokio::fs::metadata(details.file_path(file)).await {
            Ok(metadata) if metadata.len() == file.size => {}
            _ => return false,
        }
    }
    true
}

#[async_trait]
impl TaskStage for ChildProgressStage {
    fn name(&self) -> &'static str {
        "child_progress"
    }

    async fn select(&self, limit: u64) -> Result<Vec<Task>, AgentError> {
        Ok(self
            .ctx
            .repositories
            .task
            .find_by_state(TaskState::DownloadChildStarted, limit)
            .await?)
    }

    async fn handle(&self, task: &Task) -> Result<(), AgentError> {
        let order = self.ctx.order_for(task).await?;
        let Some(details) = self.ctx.daemon.bag_details(&order.torrent_hash).await? else {
            return Ok(());
        };

        if !details.is_fully_downloaded() || !files_present(&details).await {
            return Ok(());
        }

        self.ctx
            .apply(
                self.name(),
                task,
                TaskUpdate::transition(task.state, TaskState::DownloadFullSucceeded)?,
            )
            .await
    }
}
