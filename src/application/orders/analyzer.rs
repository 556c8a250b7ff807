//! Turns indexed order placements into order rows

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::time::sleep;

use crate::application::unit::PollingUnit;
use crate::config::PollConfig;
use crate::domain::errors::AgentError;
use crate::domain::models::{OrderDetails, TransactionRecord};
use crate::infrastructure::persistence::repositories::{
    OrderRepository, Repositories, TransactionRepository,
};
use crate::infrastructure::ton::StorageContract;
use crate::utils::logging;

const BATCH_SIZE: u64 = 10;

/// Outcome of analyzing one flagged transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// A new order row was written
    Created(i64),
    /// The order already existed; only the flag was cleared
    AlreadyKnown,
    /// The order contract is not active yet; the flag stays
    Deferred,
    /// The transaction names no order contract; the flag was cleared
    NoOrderAddress,
}

/// Reads flagged order placement transactions and records their orders
#[derive(Debug)]
pub struct OrderAnalyzer {
    conn: DatabaseConnection,
    repositories: Repositories,
    contract: Arc<dyn StorageContract>,
    poll: PollConfig,
    /// In-memory cursor so deferred transactions do not starve newer ones
    cursor: AtomicI64,
}

impl OrderAnalyzer {
    pub fn new(
        conn: DatabaseConnection,
        repositories: Repositories,
        contract: Arc<dyn StorageContract>,
        poll: PollConfig,
    ) -> Self {
        Self {
            conn,
            repositories,
            contract,
            poll,
            cursor: AtomicI64::new(0),
        }
    }

    /// Analyze one batch of flagged transactions; returns the batch size
    pub async fn process_batch(&self) -> Result<usize, AgentError> {
        let after_id = self.cursor.load(Ordering::SeqCst);
        let transactions = self
            .repositories
            .transaction
            .find_order_placements(after_id, BATCH_SIZE)
            .await?;

        if transactions.is_empty() {
            self.cursor.store(0, Ordering::SeqCst);
            return Ok(0);
        }

        for transaction in &transactions {
            match self.analyze(transaction).await {
                Ok(AnalyzeOutcome::Created(order_id)) => logging::log_info(&format!(
                    "[ANALYZER] Order {} created from transaction {}",
                    order_id, transaction.tx_hash
                )),
                Ok(AnalyzeOutcome::Deferred) => logging::log_info(&format!(
                    "[ANALYZER] Order contract of transaction {} is not active yet",
                    transaction.tx_hash
                )),
                Ok(AnalyzeOutcome::NoOrderAddress) => logging::log_warning(&format!(
                    "[ANALYZER] Transaction {} has no outbound message, flag cleared",
                    transaction.tx_hash
                )),
                Ok(AnalyzeOutcome::AlreadyKnown) => {}
                Err(e) => logging::log_error(&format!(
                    "[ANALYZER] Failed to analyze transaction {} (id {}): {}",
                    transaction.tx_hash, transaction.id, e
                )),
            }
            self.cursor.store(transaction.id, Ordering::SeqCst);
        }

        Ok(transactions.len())
    }

    pub async fn analyze(
        &self,
        transaction: &TransactionRecord,
    ) -> Result<AnalyzeOutcome, AgentError> {
        let Some(address) = transaction.detail.order_address() else {
            self.repositories
                .transaction
                .clear_order_placement(transaction.id)
                .await?;
            return Ok(AnalyzeOutcome::NoOrderAddress);
        };

        if self.repositories.order.find_by_address(address).await?.is_some() {
            self.repositories
                .transaction
                .clear_order_placement(transaction.id)
                .await?;
            return Ok(AnalyzeOutcome::AlreadyKnown);
        }

        let Some(state) = self.contract.order_state(address).await? else {
            return Ok(AnalyzeOutcome::Deferred);
        };
        let details = OrderDetails::from_contract(&state)?;

        let txn = self.conn.begin().await?;
        let order_id = OrderRepository::insert_with(&txn, address, &details).await?;
        TransactionRepository::clear_order_placement_with(&txn, transaction.id).await?;
        txn.commit().await?;

        Ok(AnalyzeOutcome::Created(order_id))
    }
}

#[async_trait]
impl PollingUnit for OrderAnalyzer {
    fn name(&self) -> String {
        "analyzer".to_string()
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
