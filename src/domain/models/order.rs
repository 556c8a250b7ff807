use serde::{Deserialize, Serialize};

use crate::domain::contract::{order_price_f64, PriceError, StorageContractState};

/// Lifecycle tag of an order as last seen on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Invalid,
    NotStarted,
    Started,
}

impl OrderState {
    pub fn code(self) -> i32 {
        match self {
            OrderState::Invalid => -1,
            OrderState::NotStarted => 0,
            OrderState::Started => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(OrderState::Invalid),
            0 => Some(OrderState::NotStarted),
            1 => Some(OrderState::Started),
            _ => None,
        }
    }

    pub fn from_started(started: bool) -> Self {
        if started {
            OrderState::Started
        } else {
            OrderState::NotStarted
        }
    }
}

/// Treasury settings stored alongside an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryInfo {
    pub address: Option<String>,
    pub fee_rate: u16,
}

/// Order row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub address: String,
    pub torrent_hash: String,
    pub owner_address: String,
    pub file_merkle_hash: String,
    pub file_size_in_bytes: i64,
    pub storage_period_in_sec: i64,
    pub max_storage_proof_span_in_sec: i64,
    pub max_storage_providers: i32,
    pub treasury_info: TreasuryInfo,
    pub started: bool,
    pub total_rewards: i64,
    pub period_finish: i64,
    pub price: f64,
    pub state: OrderState,
}

/// Chain-sourced fields of an order, as written by the analyzer and
/// overwritten by the refresher
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub torrent_hash: String,
    pub owner_address: String,
    pub file_merkle_hash: String,
    pub file_size_in_bytes: i64,
    pub storage_period_in_sec: i64,
    pub max_storage_proof_span_in_sec: i64,
    pub max_storage_providers: i32,
    pub treasury_info: TreasuryInfo,
    pub started: bool,
    pub total_rewards: i64,
    pub period_finish: i64,
    pub price: f64,
    pub state: OrderState,
}

impl OrderDetails {
    pub fn from_contract(state: &StorageContractState) -> Result<Self, PriceError> {
        let order = &state.order;
        let rewards = &state.rewards;
        let price = order_price_f64(rewards.total_rewards, order.storage_period, order.file_size)?;

        Ok(Self {
            torrent_hash: hex::encode(order.torrent_hash),
            owner_address: order
                .owner
                .map(|owner| owner.to_string())
                .unwrap_or_default(),
            file_merkle_hash: hex::encode(order.file_merkle_hash),
            file_size_in_bytes: clamp_i64(u128::from(order.file_size)),
            storage_period_in_sec: clamp_i64(u128::from(order.storage_period)),
            max_storage_proof_span_in_sec: clamp_i64(u128::from(order.max_storage_proof_span)),
            max_storage_providers: i32::from(order.max_storage_providers),
            treasury_info: TreasuryInfo {
                address: order.treasury.map(|treasury| treasury.to_string()),
                fee_rate: order.treasury_fee_rate,
            },
            started: rewards.started,
            total_rewards: clamp_i64(rewards.total_rewards),
            period_finish: i64::from(rewards.period_finish),
            price,
            state: OrderState::from_started(rewards.started),
        })
    }
}

fn clamp_i64(value: u128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::Address;
    use crate::domain::contract::{OrderInfo, ProviderRegistry, RewardsParams};

    #[test]
    fn test_details_from_contract() {
        let owner = Address::new(0, [3; 32]);
        let state = StorageContractState {
            order: OrderInfo {
                torrent_hash: [0x0f; 32],
                file_merkle_hash: [0xf0; 32],
                file_size: 1_000_000_000,
                storage_period: 86_400,
                max_storage_proof_span: 600,
                max_storage_providers: 5,
                owner: Some(owner),
                treasury: None,
                treasury_fee_rate: 250,
            },
            rewards: RewardsParams {
                started: false,
                total_rewards: 1_000_000_000,
                undistributed_rewards: 0,
                period_finish: 0,
                last_update_time: 0,
            },
            registry: ProviderRegistry::default(),
        };

        let details = OrderDetails::from_contract(&state).unwrap();
        assert_eq!(details.torrent_hash, "0f".repeat(32));
        assert_eq!(details.owner_address, owner.to_string());
        assert_eq!(details.price, 1.0);
        assert_eq!(details.state, OrderState::NotStarted);
        assert_eq!(details.treasury_info.fee_rate, 250);
        assert_eq!(details.treasury_info.address, None);
    }

    #[test]
    fn test_zero_period_contract_is_rejected() {
        let state = StorageContractState {
            order: OrderInfo {
                torrent_hash: [0; 32],
                file_merkle_hash: [0; 32],
                file_size: 10,
                storage_period: 0,
                max_storage_proof_span: 0,
                max_storage_providers: 0,
                owner: None,
                treasury: None,
                treasury_fee_rate: 0,
            },
            rewards: RewardsParams {
                started: false,
                total_rewards: 1,
                undistributed_rewards: 0,
                period_finish: 0,
                last_update_time: 0,
            },
            registry: ProviderRegistry::default(),
        };
        assert_eq!(
            OrderDetails::from_contract(&state),
            Err(PriceError::ZeroPeriod)
        );
    }

    #[test]
    fn test_state_codes() {
        for state in [OrderState::Invalid, OrderState::NotStarted, OrderState::Started] {
            assert_eq!(OrderState::from_code(state.code()), Some(state));
        }
        assert_eq!(OrderState::from_started(true), OrderState::Started);
    }
}
