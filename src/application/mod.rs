//! Polling units of the agent and their wiring

pub mod indexer;
pub mod orders;
pub mod scheduler;
pub mod tasks;
pub mod unit;

pub use scheduler::Scheduler;
pub use unit::PollingUnit;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::infrastructure::persistence::Repositories;
use crate::infrastructure::proof::ProofGenerator;
use crate::infrastructure::storage_daemon::StorageDaemon;
use crate::infrastructure::ton::{ChainProvider, StorageContract};
use crate::utils::Clock;
use indexer::TransactionIndexer;
use orders::{OrderAnalyzer, OrderRefresher};
use tasks::{
    ChildProgressStage, ChildRequestStage, HeaderProgressStage, HeaderRequestStage, ProofAckStage,
    ProofSubmissionStage, RegistrationStage, RewardClaimStage, StagePoller, TaskContext,
    TaskGenerator,
};

/// Handles shared by every unit, built once at startup
#[derive(Debug, Clone)]
pub struct AgentServices {
    pub conn: DatabaseConnection,
    pub repositories: Repositories,
    pub provider: Arc<dyn ChainProvider>,
    pub contract: Arc<dyn StorageContract>,
    pub daemon: Arc<dyn StorageDaemon>,
    pub proofs: Arc<dyn ProofGenerator>,
    pub clock: Arc<dyn Clock>,
}

/// Build a scheduler holding the indexer, analyzer, refresher, generator
/// and one poller per lifecycle stage
pub fn build_scheduler(config: &AppConfig, services: AgentServices) -> Scheduler {
    let poll = config.poll.clone();
    let ctx = TaskContext::new(
        services.repositories.clone(),
        services.contract.clone(),
        services.daemon.clone(),
        services.proofs.clone(),
        services.clock.clone(),
        config.task.clone(),
        &config.storage_daemon,
    );

    let mut scheduler = Scheduler::new();
    scheduler.add_unit(Arc::new(TransactionIndexer::new(
        services.provider.clone(),
        services.repositories.transaction.clone(),
        config.ton.bag_address.clone(),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(OrderAnalyzer::new(
        services.conn.clone(),
        services.repositories.clone(),
        services.contract.clone(),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(OrderRefresher::new(
        services.repositories.clone(),
        services.contract.clone(),
        services.clock.clone(),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(TaskGenerator::new(
        services.conn,
        services.repositories,
        services.contract,
        &config.task,
        poll.clone(),
    )));

    scheduler.add_unit(Arc::new(StagePoller::new(
        HeaderRequestStage::new(ctx.clone()),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(StagePoller::new(
        HeaderProgressStage::new(ctx.clone()),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(StagePoller::new(
        ChildRequestStage::new(ctx.clone()),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(StagePoller::new(
        ChildProgressStage::new(ctx.clone()),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(StagePoller::new(
        RegistrationStage::new(ctx.clone()),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(StagePoller::new(
        ProofSubmissionStage::new(ctx.clone()),
        poll.clone(),
    )));
    scheduler.add_unit(Arc::new(StagePoller::new(ProofAckStage::new(ctx.clone()), poll.clone())));
    scheduler.add_unit(Arc::new(StagePoller::new(RewardClaimStage::new(ctx), poll)));

    scheduler
}
