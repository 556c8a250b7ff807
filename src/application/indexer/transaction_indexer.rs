//! Backward walk over the bag contract's transaction chain

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use crate::application::unit::PollingUnit;
use crate::config::PollConfig;
use crate::domain::errors::AgentError;
use crate::domain::models::{ChainTransaction, NewTransaction};
use crate::infrastructure::persistence::repositories::TransactionRepository;
use crate::infrastructure::ton::{ChainProvider, TransactionLookup};
use crate::utils::logging;

/// Indexes the transactions of one contract, newest first, until it meets
/// a transaction it already stored
#[derive(Debug)]
pub struct TransactionIndexer {
    provider: Arc<dyn ChainProvider>,
    repository: TransactionRepository,
    address: String,
    poll: PollConfig,
}

impl TransactionIndexer {
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        repository: TransactionRepository,
        address: String,
        poll: PollConfig,
    ) -> Self {
        Self {
            provider,
            repository,
            address,
            poll,
        }
    }

    /// One pass from the current head backwards. Returns the number of
    /// newly stored transactions.
    pub async fn run_iteration(&self) -> Result<usize, AgentError> {
        let account = match self.provider.get_account_state(&self.address).await {
            Ok(account) => account,
            Err(e) => {
                logging::log_error(&format!(
                    "[INDEXER] Failed to fetch state of {}: {}",
                    self.address, e
                ));
                return Ok(0);
            }
        };

        if !account.is_active() {
            return Err(AgentError::ContractInactive(self.address.clone()));
        }

        let Some(last) = account.last_transaction else {
            logging::log_info(&format!(
                "[INDEXER] Contract {} has no transactions yet",
                self.address
            ));
            return Ok(0);
        };

        match self
            .provider
            .get_transaction(&self.address, last.lt, &last.hash)
            .await
        {
            TransactionLookup::Found(head) => self.walk_back(head).await,
            TransactionLookup::Expired => {
                logging::log_warning(&format!(
                    "[INDEXER] Head transaction {}:{} is not available yet",
                    last.lt, last.hash
                ));
                Ok(0)
            }
            TransactionLookup::Failed(reason) => {
                logging::log_error(&format!(
                    "[INDEXER] Failed to fetch head transaction {}:{}: {}",
                    last.lt, last.hash, reason
                ));
                Ok(0)
            }
        }
    }

    async fn walk_back(&self, head: ChainTransaction) -> Result<usize, AgentError> {
        let mut stored = 0;
        let mut current = head;

        loop {
            let record = NewTransaction::from_chain(&self.address, &current);
            if !self.repository.insert_if_absent(&record).await? {
                logging::log_debug(&format!(
                    "[INDEXER] Reached indexed transaction at lt {}",
                    current.lt
                ));
                break;
            }
            stored += 1;
            if record.is_order_placement {
                logging::log_info(&format!(
                    "[INDEXER] Order placement found at lt {} ({})",
                    current.lt, current.hash
                ));
            }

            if current.prev_lt == 0 {
                break;
            }
            sleep(Duration::from_millis(self.poll.indexer_walk_delay_ms)).await;

            match self
                .provider
                .get_transaction(&self.address, current.prev_lt, &current.prev_hash)
                .await
            {
                TransactionLookup::Found(previous) => current = previous,
                TransactionLookup::Expired => {
                    logging::log_warning(&format!(
                        "[INDEXER] Transaction {}:{} has expired on the node, stopping walk",
                        current.prev_lt, current.prev_hash
                    ));
                    break;
                }
                TransactionLookup::Failed(reason) => {
                    logging::log_error(&format!(
                        "[INDEXER] Failed to fetch transaction {}:{}: {}",
                        current.prev_lt, current.prev_hash, reason
                    ));
                    break;
                }
            }
        }

        if stored > 0 {
            logging::log_info(&format!(
                "[INDEXER] Stored {} new transactions of {}",
                stored, self.address
            ));
        }
        Ok(stored)
    }
}

#[async_trait]
impl PollingUnit for TransactionIndexer {
    fn name(&self) -> String {
        "indexer".to_string()
    }

    async fn run(&self) -> Result<(), AgentError> {
        logging::log_info(&format!("[INDEXER] Tracking contract {}", self.address));
        loop {
            self.run_iteration().await?;
            sleep(Duration::from_millis(self.poll.indexer_interval_ms)).await;
        }
    }
}
