//! Keeps chain-sourced order fields current

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::sleep;

use crate::application::unit::PollingUnit;
use crate::config::PollConfig;
use crate::domain::errors::AgentError;
use crate::domain::models::{Order, OrderDetails};
use crate::infrastructure::persistence::repositories::{Repositories, LAST_ORDER_UPDATE_ID};
use crate::infrastructure::ton::StorageContract;
use crate::utils::{logging, Clock};

const BATCH_SIZE: u64 = 10;

/// Re-reads live orders from chain in id order, then starts over
#[derive(Debug)]
pub struct OrderRefresher {
    repositories: Repositories,
    contract: Arc<dyn StorageContract>,
    clock: Arc<dyn Clock>,
    poll: PollConfig,
}

impl OrderRefresher {
    pub fn new(
        repositories: Repositories,
        contract: Arc<dyn StorageContract>,
        clock: Arc<dyn Clock>,
        poll: PollConfig,
    ) -> Self {
        Self {
            repositories,
            contract,
            clock,
            poll,
        }
    }

    /// Refresh one batch after the stored cursor. An empty batch resets the
    /// cursor and returns 0.
    pub async fn process_batch(&self) -> Result<usize, AgentError> {
        let cursor = self
            .repositories
            .config
            .get_i64(LAST_ORDER_UPDATE_ID, 0)
            .await?;
        let orders = self
            .repositories
            .order
            .find_refreshable(cursor, self.clock.now(), BATCH_SIZE)
            .await?;

        if orders.is_empty() {
            self.repositories.config.set(LAST_ORDER_UPDATE_ID, "0").await?;
            return Ok(0);
        }

        for order in &orders {
            if let Err(e) = self.refresh(order).await {
                logging::log_error(&format!(
                    "[REFRESHER] Failed to refresh order {} ({}): {}",
                    order.id, order.address, e
                ));
            }
            self.repositories
                .config
                .set(LAST_ORDER_UPDATE_ID, &order.id.to_string())
                .await?;
        }

        Ok(orders.len())
    }

    async fn refresh(&self, order: &Order) -> Result<(), AgentError> {
        match self.contract.order_state(&order.address).await? {
            Some(state) => {
                let details = OrderDetails::from_contract(&state)?;
                self.repositories.order.update_details(order.id, &details).await?;
            }
            None => {
                logging::log_info(&format!(
                    "[REFRESHER] Order {} contract is gone, marking invalid",
                    order.id
                ));
                self.repositories.order.mark_invalid(order.id).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PollingUnit for OrderRefresher {
    fn name(&self) -> String {
        "refresher".to_string()
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
